use sqlx::PgPool;

use crate::addresses::{becomes_default, AddressRepository, SaveAddressRequest, SavedAddress, MAX_SAVED_ADDRESSES};
use crate::error::ApiError;

fn address_not_found(id: i32) -> ApiError {
    ApiError::NotFound {
        resource: "Address".to_string(),
        id: id.to_string(),
    }
}

/// Two requests raced to set a default; the partial unique index kept one
fn default_conflict(err: sqlx::Error) -> ApiError {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => ApiError::Conflict {
            message: "Default address changed concurrently, please retry".to_string(),
        },
        other => other.into(),
    }
}

/// Service for the saved address book
///
/// A user with any addresses always has exactly one default.
#[derive(Clone)]
pub struct AddressService {
    repository: AddressRepository,
}

impl AddressService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AddressRepository::new(pool),
        }
    }

    pub async fn list(&self, user_id: i32) -> Result<Vec<SavedAddress>, ApiError> {
        Ok(self.repository.list(user_id).await?)
    }

    pub async fn create(&self, user_id: i32, request: SaveAddressRequest) -> Result<SavedAddress, ApiError> {
        request.validate_all()?;

        let mut tx = self.repository.pool().begin().await?;

        let existing = AddressRepository::count(&mut *tx, user_id).await?;
        if existing >= MAX_SAVED_ADDRESSES {
            return Err(ApiError::BadRequest(format!(
                "You can save at most {} addresses",
                MAX_SAVED_ADDRESSES
            )));
        }

        let is_default = becomes_default(request.is_default, existing);
        if is_default {
            AddressRepository::clear_default(&mut *tx, user_id).await?;
        }
        let saved = AddressRepository::insert(&mut *tx, user_id, &request, is_default)
            .await
            .map_err(default_conflict)?;

        tx.commit().await.map_err(default_conflict)?;

        tracing::debug!("User {} saved address {}", user_id, saved.id);
        Ok(saved)
    }

    pub async fn update(&self, user_id: i32, id: i32, request: SaveAddressRequest) -> Result<SavedAddress, ApiError> {
        request.validate_all()?;

        let mut tx = self.repository.pool().begin().await?;

        if request.is_default {
            AddressRepository::clear_default(&mut *tx, user_id).await?;
        }
        let saved = AddressRepository::update(&mut *tx, id, user_id, &request, request.is_default)
            .await
            .map_err(default_conflict)?
            .ok_or_else(|| address_not_found(id))?;

        tx.commit().await.map_err(default_conflict)?;
        Ok(saved)
    }

    /// Delete an address, handing the default to the newest remaining one
    pub async fn delete(&self, user_id: i32, id: i32) -> Result<(), ApiError> {
        let mut tx = self.repository.pool().begin().await?;

        let was_default = AddressRepository::delete(&mut *tx, id, user_id)
            .await?
            .ok_or_else(|| address_not_found(id))?;
        if was_default {
            AddressRepository::promote_latest(&mut *tx, user_id)
                .await
                .map_err(default_conflict)?;
        }

        tx.commit().await?;
        tracing::debug!("User {} deleted address {}", user_id, id);
        Ok(())
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::orders::Address;

    fn request(label: &str, is_default: bool) -> SaveAddressRequest {
        SaveAddressRequest {
            label: Some(label.to_string()),
            address: Address {
                full_name: "Asha Rao".to_string(),
                phone: "+91 98765 43210".to_string(),
                line1: format!("{} Street", label),
                line2: None,
                city: "Kolkata".to_string(),
                state: "West Bengal".to_string(),
                postal_code: "700016".to_string(),
                country: "India".to_string(),
            },
            is_default,
        }
    }

    fn default_label(addresses: &[SavedAddress]) -> Vec<String> {
        addresses
            .iter()
            .filter(|a| a.is_default)
            .filter_map(|a| a.label.clone())
            .collect()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_default_moves_between_addresses(pool: PgPool) {
        let service = AddressService::new(pool);

        let home = service.create(7, request("Home", false)).await.unwrap();
        assert!(home.is_default);

        service.create(7, request("Office", false)).await.unwrap();
        assert_eq!(default_label(&service.list(7).await.unwrap()), vec!["Home"]);

        service.create(7, request("Parents", true)).await.unwrap();
        assert_eq!(default_label(&service.list(7).await.unwrap()), vec!["Parents"]);

        service.update(7, home.id, request("Home", true)).await.unwrap();
        assert_eq!(default_label(&service.list(7).await.unwrap()), vec!["Home"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_deleting_default_promotes_another(pool: PgPool) {
        let service = AddressService::new(pool);
        let home = service.create(7, request("Home", false)).await.unwrap();
        service.create(7, request("Office", false)).await.unwrap();

        service.delete(7, home.id).await.unwrap();

        let remaining = service.list(7).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_default);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_addresses_are_private(pool: PgPool) {
        let service = AddressService::new(pool);
        let home = service.create(7, request("Home", false)).await.unwrap();

        assert!(matches!(
            service.update(8, home.id, request("Mine", false)).await,
            Err(ApiError::NotFound { .. })
        ));
        assert!(matches!(service.delete(8, home.id).await, Err(ApiError::NotFound { .. })));
        assert!(service.list(8).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_address_book_limit(pool: PgPool) {
        let service = AddressService::new(pool);
        for n in 0..MAX_SAVED_ADDRESSES {
            service.create(7, request(&format!("Place {}", n), false)).await.unwrap();
        }

        assert!(matches!(
            service.create(7, request("One more", false)).await,
            Err(ApiError::BadRequest(_))
        ));
    }
}
