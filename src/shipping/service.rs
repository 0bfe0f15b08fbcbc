//! Shipping service layer - zone administration and rate resolution

use std::collections::HashMap;

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use super::model::{
    RateRequest, Resolution, ResolveRequest, ShippingRate, ShippingZone, ShippingZoneRow,
    ZoneRequest,
};
use super::resolver::ShippingRateResolver;
use crate::error::ApiError;

#[derive(Clone)]
pub struct ShippingService {
    db_pool: PgPool,
}

impl ShippingService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Resolve applicable rates for a destination and package
    pub async fn resolve(&self, request: ResolveRequest) -> Result<Resolution, ApiError> {
        let zones = self.load_zones(true).await?;
        let resolution =
            ShippingRateResolver::new(&zones).resolve(&request.destination, &request.package)?;

        tracing::debug!(
            country = %request.destination.country,
            zone = %resolution.zone_name,
            rates = resolution.rates.len(),
            "Shipping rates resolved"
        );

        Ok(resolution)
    }

    pub async fn list_zones(&self) -> Result<Vec<ShippingZone>, ApiError> {
        self.load_zones(false).await
    }

    pub async fn get_zone(&self, id: Uuid) -> Result<ShippingZone, ApiError> {
        let row = sqlx::query_as::<_, ShippingZoneRow>("SELECT * FROM shipping_zones WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Shipping zone {} not found", id)))?;

        let rates = sqlx::query_as::<_, ShippingRate>(
            "SELECT * FROM shipping_rates WHERE zone_id = $1 ORDER BY position ASC",
        )
        .bind(id)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(ShippingZone::from_row(row, rates))
    }

    pub async fn create_zone(&self, request: ZoneRequest) -> Result<ShippingZone, ApiError> {
        request.validate()?;
        request.check_rules()?;

        let mut tx = self.db_pool.begin().await?;

        if request.is_default {
            clear_default_zone(&mut tx).await?;
        }

        let zone_id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO shipping_zones (id, name, countries, states, is_active, is_default, position, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            "#,
        )
        .bind(zone_id)
        .bind(request.name.trim())
        .bind(request.normalized_countries())
        .bind(request.normalized_states())
        .bind(request.is_active)
        .bind(request.is_default)
        .bind(request.position)
        .execute(&mut *tx)
        .await?;

        insert_rates(&mut tx, zone_id, &request.rates).await?;
        tx.commit().await?;

        tracing::info!(zone_id = %zone_id, name = %request.name, default = request.is_default, "Shipping zone created");

        self.get_zone(zone_id).await
    }

    /// Replace a zone's attributes and its whole rate table
    pub async fn update_zone(&self, id: Uuid, request: ZoneRequest) -> Result<ShippingZone, ApiError> {
        request.validate()?;
        request.check_rules()?;

        let mut tx = self.db_pool.begin().await?;

        if request.is_default {
            clear_default_zone(&mut tx).await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE shipping_zones
            SET name = $1, countries = $2, states = $3, is_active = $4, is_default = $5,
                position = $6, updated_at = NOW()
            WHERE id = $7
            "#,
        )
        .bind(request.name.trim())
        .bind(request.normalized_countries())
        .bind(request.normalized_states())
        .bind(request.is_active)
        .bind(request.is_default)
        .bind(request.position)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Shipping zone {} not found", id)));
        }

        sqlx::query("DELETE FROM shipping_rates WHERE zone_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_rates(&mut tx, id, &request.rates).await?;
        tx.commit().await?;

        tracing::info!(zone_id = %id, "Shipping zone updated");

        self.get_zone(id).await
    }

    pub async fn delete_zone(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = sqlx::query("DELETE FROM shipping_zones WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;

        if deleted.rows_affected() == 0 {
            return Err(ApiError::NotFound(format!("Shipping zone {} not found", id)));
        }

        tracing::info!(zone_id = %id, "Shipping zone deleted");
        Ok(())
    }

    async fn load_zones(&self, active_only: bool) -> Result<Vec<ShippingZone>, ApiError> {
        let rows = sqlx::query_as::<_, ShippingZoneRow>(
            r#"
            SELECT * FROM shipping_zones
            WHERE ($1 = FALSE OR is_active)
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(active_only)
        .fetch_all(&self.db_pool)
        .await?;

        let ids: Vec<Uuid> = rows.iter().map(|z| z.id).collect();
        let rates = sqlx::query_as::<_, ShippingRate>(
            "SELECT * FROM shipping_rates WHERE zone_id = ANY($1) ORDER BY position ASC",
        )
        .bind(&ids)
        .fetch_all(&self.db_pool)
        .await?;

        let mut by_zone: HashMap<Uuid, Vec<ShippingRate>> = HashMap::new();
        for rate in rates {
            by_zone.entry(rate.zone_id).or_default().push(rate);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let rates = by_zone.remove(&row.id).unwrap_or_default();
                ShippingZone::from_row(row, rates)
            })
            .collect())
    }
}

async fn clear_default_zone(conn: &mut PgConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE shipping_zones SET is_default = FALSE, updated_at = NOW() WHERE is_default")
        .execute(conn)
        .await?;
    Ok(())
}

async fn insert_rates(
    conn: &mut PgConnection,
    zone_id: Uuid,
    rates: &[RateRequest],
) -> Result<(), sqlx::Error> {
    for (position, rate) in rates.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO shipping_rates (id, zone_id, name, rate_type, amount, min_days, max_days, min_bound, max_bound, position)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(zone_id)
        .bind(rate.name.trim())
        .bind(rate.rate_type)
        .bind(rate.amount)
        .bind(rate.min_days)
        .bind(rate.max_days)
        .bind(rate.min_bound)
        .bind(rate.max_bound)
        .bind(position as i32)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
