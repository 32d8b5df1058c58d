use bakery_shop_api::{
    models::{OrderStatus, resolve_image_src},
    regions::{communes_of, format_address, is_valid_commune},
    validation::{
        CardInput, age_on, validate_address, validate_age, validate_card, validate_email,
        validate_expiry, validate_name, validate_password, validate_phone, validate_product_code,
    },
};
use chrono::NaiveDate;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn names_are_letters_only() {
    assert!(validate_name("María José").is_ok());
    assert!(validate_name("  ").is_err());
    assert!(validate_name("R2D2").is_err());
    assert!(validate_name(&"a".repeat(51)).is_err());
}

#[test]
fn email_shape_and_length() {
    assert!(validate_email("ana@gmail.com").is_ok());
    assert!(validate_email("ana@gmail").is_err());
    assert!(validate_email("@gmail.com").is_err());
    assert!(validate_email("ana@@gmail.com").is_err());
    assert!(validate_email("a n@gmail.com").is_err());
    assert!(validate_email("averyveryverylongname@gmail.com").is_err());
}

#[test]
fn age_counts_whole_years() {
    let today = date(2025, 6, 15);
    assert_eq!(age_on(date(2000, 6, 15), today), 25);
    assert_eq!(age_on(date(2000, 6, 16), today), 24);
    assert!(validate_age(date(2010, 1, 1), today).is_err());
    assert_eq!(validate_age(date(2007, 6, 15), today), Ok(18));
    assert!(validate_age(date(1920, 1, 1), today).is_err());
}

#[test]
fn phone_and_password_rules() {
    assert!(validate_phone("912345678").is_ok());
    assert!(validate_phone("91234567").is_err());
    assert!(validate_phone("9123456a8").is_err());
    assert!(validate_password("abcd").is_ok());
    assert!(validate_password("abc").is_err());
    assert!(validate_password("").is_err());
}

#[test]
fn product_codes() {
    assert!(validate_product_code("TC001").is_ok());
    assert!(validate_product_code("P1").is_err());
    assert!(validate_product_code("TC-01").is_err());
    assert!(validate_product_code("ABCDEFG").is_err());
}

#[test]
fn addresses_need_a_matching_commune() {
    let region = "Región Metropolitana de Santiago";
    assert!(communes_of(region).is_some());
    assert!(is_valid_commune(region, "santiago"));
    assert!(!is_valid_commune(region, "Iquique"));

    assert!(validate_address("Av. Matta", "100", region, "Santiago").is_empty());
    let errors = validate_address("Av. Matta", "100", region, "Iquique");
    assert!(errors.contains("commune"));
    let errors = validate_address("", "", "Atlantis", "Santiago");
    assert!(errors.contains("street"));
    assert!(errors.contains("number"));
    assert!(errors.contains("region"));
    assert!(!errors.contains("commune"));

    assert_eq!(
        format_address(" Av. Matta ", "100", "Santiago", region),
        "Av. Matta 100, Santiago, Región Metropolitana de Santiago"
    );
}

#[test]
fn card_checks_return_last_four_digits() {
    let today = date(2025, 6, 15);
    let card = CardInput {
        number: "4111 1111 1111 1234",
        expiry: "06/25",
        holder: "Ana Perez",
        cvv: "123",
    };
    assert_eq!(validate_card(&card, today).unwrap(), "1234");

    let short = CardInput {
        number: "4111 1111 1111 123",
        cvv: "12",
        ..card.clone()
    };
    let errors = validate_card(&short, today).unwrap_err();
    assert!(errors.contains("card_number"));
    assert!(errors.contains("card_cvv"));
    assert!(!errors.contains("card_expiry"));

    let bad = CardInput {
        number: "4111",
        expiry: "13/30",
        holder: "Ana 2",
        cvv: "12",
    };
    let errors = validate_card(&bad, today).unwrap_err();
    for field in ["card_number", "card_expiry", "card_holder", "card_cvv"] {
        assert!(errors.contains(field), "missing {field}");
    }
}

#[test]
fn expiry_is_valid_through_its_month() {
    let today = date(2025, 6, 30);
    assert!(validate_expiry("06/25", today).is_ok());
    assert!(validate_expiry("05/25", today).is_err());
    assert!(validate_expiry("6/25", today).is_err());
    assert!(validate_expiry("0625", today).is_err());
}

#[test]
fn order_status_accepts_both_vocabularies() {
    assert_eq!("pendiente".parse::<OrderStatus>().unwrap(), OrderStatus::Pending);
    assert_eq!("En proceso".parse::<OrderStatus>().unwrap(), OrderStatus::Preparing);
    assert_eq!("en-transito".parse::<OrderStatus>().unwrap(), OrderStatus::Shipped);
    assert_eq!("DELIVERED".parse::<OrderStatus>().unwrap(), OrderStatus::Delivered);
    assert_eq!("canceled".parse::<OrderStatus>().unwrap(), OrderStatus::Cancelled);
    assert!("lost".parse::<OrderStatus>().is_err());
}

#[test]
fn image_sources_resolve() {
    assert_eq!(resolve_image_src(Some("tc001.jpg")), "/images/productos/tc001.jpg");
    assert_eq!(resolve_image_src(Some("https://cdn.test/a.png")), "https://cdn.test/a.png");
    assert_eq!(resolve_image_src(Some("data:image/png;base64,AA")), "data:image/png;base64,AA");
    assert_eq!(resolve_image_src(Some("  ")), "/images/productos/imagenpasteleria.jpg");
    assert_eq!(resolve_image_src(None), "/images/productos/imagenpasteleria.jpg");
}
