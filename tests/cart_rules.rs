use bakery_shop_api::{
    cart::{Cart, CartError},
    models::Product,
};
use chrono::Utc;

fn product(id: &str, stock: i32, personalizable: bool) -> Product {
    Product {
        id: id.to_string(),
        name: format!("Product {id}"),
        description: String::new(),
        price: 1000,
        category: "Tortas".to_string(),
        stock,
        image: None,
        personalizable,
        created_at: Utc::now(),
    }
}

#[test]
fn adding_merges_lines_and_caps_at_stock() {
    let cake = product("TC001", 5, false);
    let mut cart = Cart::default();

    let first = cart.add(&cake, 3, None).unwrap();
    assert_eq!(first.quantity, 3);
    assert!(!first.capped);

    let second = cart.add(&cake, 4, None).unwrap();
    assert_eq!(second.quantity, 5);
    assert!(second.capped);
    assert_eq!(cart.lines.len(), 1);
    assert_eq!(cart.item_count(), 5);
}

#[test]
fn adding_rejects_bad_requests() {
    let mut cart = Cart::default();
    assert_eq!(
        cart.add(&product("TC001", 5, false), 0, None),
        Err(CartError::InvalidQuantity)
    );
    assert_eq!(
        cart.add(&product("TC002", 0, false), 1, None),
        Err(CartError::OutOfStock("TC002".into()))
    );
    assert_eq!(
        cart.add(&product("TC003", 5, false), 1, Some("Feliz cumple")),
        Err(CartError::NotPersonalizable("TC003".into()))
    );
    assert!(matches!(
        cart.add(&product("TC004", 5, true), 1, Some(&"x".repeat(201))),
        Err(CartError::InvalidPersonalization(_))
    ));
    assert!(cart.is_empty());
}

#[test]
fn personalization_is_kept_for_personalizable_products() {
    let cake = product("TC001", 5, true);
    let mut cart = Cart::default();
    cart.add(&cake, 1, Some("  Feliz cumple  ")).unwrap();
    assert_eq!(
        cart.line("TC001").unwrap().personalization.as_deref(),
        Some("Feliz cumple")
    );

    // A blank message on a later add keeps the earlier one.
    cart.add(&cake, 1, Some("   ")).unwrap();
    assert_eq!(
        cart.line("TC001").unwrap().personalization.as_deref(),
        Some("Feliz cumple")
    );
}

#[test]
fn set_quantity_clamps_and_zero_removes() {
    let cake = product("TC001", 4, false);
    let mut cart = Cart::default();
    cart.add(&cake, 1, None).unwrap();

    assert_eq!(cart.set_quantity(&cake, 10).unwrap(), 4);
    assert_eq!(cart.line("TC001").unwrap().quantity, 4);

    assert_eq!(cart.set_quantity(&cake, -3).unwrap(), 0);
    assert!(cart.line("TC001").is_none());

    assert_eq!(
        cart.set_quantity(&cake, 1),
        Err(CartError::NotInCart("TC001".into()))
    );
}

#[test]
fn adopt_only_fills_an_empty_cart() {
    let cake = product("TC001", 4, false);
    let tart = product("PT002", 4, false);

    let mut guest = Cart::default();
    guest.add(&cake, 2, None).unwrap();

    let mut empty = Cart::default();
    assert!(empty.adopt(guest.clone()));
    assert_eq!(empty.line("TC001").unwrap().quantity, 2);

    let mut existing = Cart::default();
    existing.add(&tart, 1, None).unwrap();
    assert!(!existing.adopt(guest));
    assert!(existing.line("TC001").is_none());

    assert!(!Cart::default().adopt(Cart::default()));
}

#[test]
fn remove_and_clear() {
    let cake = product("TC001", 4, false);
    let mut cart = Cart::default();
    cart.add(&cake, 1, None).unwrap();
    assert!(!cart.remove("NOPE1"));
    assert!(cart.remove("TC001"));
    cart.add(&cake, 1, None).unwrap();
    cart.clear();
    assert!(cart.is_empty());
}
