use sqlx::PgPool;
use validator::Validate;

use crate::cart::{
    AddToCartRequest, Cart, CartError, CartRepository, UpdateCartItemRequest, MAX_CART_LINES, MAX_LINE_QUANTITY,
};

/// Service layer for the shopping cart
///
/// The cart only remembers boxes and quantities. Prices and availability are
/// read from the catalog each time the cart is shown.
#[derive(Clone)]
pub struct CartService {
    repository: CartRepository,
}

impl CartService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: CartRepository::new(pool),
        }
    }

    pub async fn get_cart(&self, user_id: i32) -> Result<Cart, CartError> {
        let lines = self.repository.lines(user_id).await?;
        Ok(Cart::from_lines(lines))
    }

    pub async fn add_item(&self, user_id: i32, request: AddToCartRequest) -> Result<Cart, CartError> {
        request
            .validate()
            .map_err(|e| CartError::ValidationError(e.to_string()))?;

        if !self.repository.box_is_active(request.box_id).await? {
            return Err(CartError::BoxNotFound(request.box_id));
        }

        if !self.repository.contains(user_id, request.box_id).await?
            && self.repository.line_count(user_id).await? >= MAX_CART_LINES
        {
            return Err(CartError::TooManyLines { max: MAX_CART_LINES });
        }

        let added = self
            .repository
            .add(user_id, request.box_id, request.quantity, request.personalization.as_deref())
            .await?;
        if !added {
            return Err(CartError::QuantityLimit { max: MAX_LINE_QUANTITY });
        }

        tracing::debug!("User {} added {} of box {} to cart", user_id, request.quantity, request.box_id);
        self.get_cart(user_id).await
    }

    pub async fn update_item(
        &self,
        user_id: i32,
        box_id: i32,
        request: UpdateCartItemRequest,
    ) -> Result<Cart, CartError> {
        request
            .validate()
            .map_err(|e| CartError::ValidationError(e.to_string()))?;

        let updated = self
            .repository
            .set_quantity(user_id, box_id, request.quantity, request.personalization.as_deref())
            .await?;
        if !updated {
            return Err(CartError::NotInCart(box_id));
        }

        self.get_cart(user_id).await
    }

    pub async fn remove_item(&self, user_id: i32, box_id: i32) -> Result<Cart, CartError> {
        if !self.repository.remove(user_id, box_id).await? {
            return Err(CartError::NotInCart(box_id));
        }
        self.get_cart(user_id).await
    }

    pub async fn clear(&self, user_id: i32) -> Result<(), CartError> {
        let removed = self.repository.clear(user_id).await?;
        tracing::debug!("Cleared {} lines from cart of user {}", removed, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod db_tests {
    use super::*;
    use crate::db::insert_test_box;
    use rust_decimal_macros::dec;

    fn add(box_id: i32, quantity: i32) -> AddToCartRequest {
        AddToCartRequest {
            box_id,
            quantity,
            personalization: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_adding_twice_merges_line(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Birthday Bash", dec!(499), 20).await;
        let service = CartService::new(pool);

        service.add_item(7, add(box_id, 2)).await.unwrap();
        let cart = service.add_item(7, add(box_id, 3)).await.unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.subtotal, dec!(2495));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_line_quantity_capped(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Bulk Hamper", dec!(100), 500).await;
        let service = CartService::new(pool);

        service.add_item(7, add(box_id, 90)).await.unwrap();
        assert!(matches!(
            service.add_item(7, add(box_id, 20)).await,
            Err(CartError::QuantityLimit { max: 100 })
        ));
        assert_eq!(service.get_cart(7).await.unwrap().items[0].quantity, 90);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_unknown_box_and_missing_line(pool: PgPool) {
        let service = CartService::new(pool);

        assert!(matches!(
            service.add_item(7, add(9999, 1)).await,
            Err(CartError::BoxNotFound(9999))
        ));
        assert!(matches!(service.remove_item(7, 9999).await, Err(CartError::NotInCart(9999))));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_carts_are_per_user(pool: PgPool) {
        let box_id = insert_test_box(&pool, "Diwali Diyas", dec!(799), 10).await;
        let service = CartService::new(pool);

        service.add_item(7, add(box_id, 1)).await.unwrap();
        assert!(service.get_cart(8).await.unwrap().items.is_empty());

        service.clear(7).await.unwrap();
        assert!(service.get_cart(7).await.unwrap().items.is_empty());
    }
}
