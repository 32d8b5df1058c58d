use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use bakery_shop_api::{
    config::AppConfig,
    routes::create_app,
    seed::{ADMIN_ACCOUNT_EMAIL, SYSTEM_ACCOUNT_EMAIL, SeedAccounts, seed_store},
    state::AppState,
    store::{DynStore, MemoryStore},
};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

async fn seeded_app() -> anyhow::Result<Router> {
    let store: DynStore = Arc::new(MemoryStore::new());
    seed_store(&store, &SeedAccounts::default()).await?;
    Ok(create_app(AppState::new(store, AppConfig::new("test-secret"))))
}

struct Call<'a> {
    method: &'a str,
    uri: &'a str,
    token: Option<&'a str>,
    session: Option<Uuid>,
    body: Option<Value>,
}

impl<'a> Call<'a> {
    fn new(method: &'a str, uri: &'a str) -> Self {
        Self {
            method,
            uri,
            token: None,
            session: None,
            body: None,
        }
    }

    fn token(mut self, token: &'a str) -> Self {
        self.token = Some(token);
        self
    }

    fn session(mut self, session: Uuid) -> Self {
        self.session = Some(session);
        self
    }

    fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    async fn send(self, app: &Router) -> anyhow::Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        if let Some(token) = self.token {
            builder = builder.header("authorization", token);
        }
        if let Some(session) = self.session {
            builder = builder.header("x-cart-session", session.to_string());
        }
        let request = match self.body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = app.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}

async fn login(app: &Router, email: &str, password: &str) -> anyhow::Result<String> {
    let (status, body) = Call::new("POST", "/api/auth/login")
        .json(json!({ "email": email, "password": password }))
        .send(app)
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    Ok(body["data"]["token"].as_str().unwrap_or_default().to_string())
}

async fn register(app: &Router, email: &str, birth_date: &str) -> anyhow::Result<(StatusCode, Value)> {
    Call::new("POST", "/api/auth/register")
        .json(json!({
            "name": "Ana Perez",
            "email": email,
            "password": "secret",
            "confirm_password": "secret",
            "birth_date": birth_date,
            "phone": "912345678",
            "address": {
                "street": "Los Carrera",
                "number": "50",
                "region": "Región Metropolitana de Santiago",
                "commune": "Santiago",
            },
        }))
        .send(app)
        .await
}

#[tokio::test]
async fn health_and_unknown_routes() -> anyhow::Result<()> {
    let app = seeded_app().await?;

    let (status, body) = Call::new("GET", "/health").send(&app).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");

    let (status, body) = Call::new("GET", "/api/nothing-here").send(&app).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/api/nothing-here");
    Ok(())
}

#[tokio::test]
async fn catalog_is_public_and_filterable() -> anyhow::Result<()> {
    let app = seeded_app().await?;

    let (status, body) = Call::new("GET", "/api/productos?categoria=tortas%20cuadradas")
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 2);
    let ids: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p["id"].as_str())
        .collect();
    assert!(ids.contains(&"TC001"));
    assert!(ids.contains(&"TC002"));

    let (status, body) = Call::new("GET", "/api/productos/tc001").send(&app).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["image_url"], "/images/productos/tc001.jpg");

    let (status, _) = Call::new("GET", "/api/productos/ZZ999").send(&app).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = Call::new("GET", "/api/productos/categorias").send(&app).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c == "Tortas Cuadradas")
    );

    let (status, _) = Call::new("GET", "/api/productos?min_price=5000&max_price=100")
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn guest_cart_follows_the_shopper_through_checkout() -> anyhow::Result<()> {
    let app = seeded_app().await?;
    let session = Uuid::new_v4();

    let (status, body) = Call::new("POST", "/api/carrito")
        .session(session)
        .json(json!({ "product_id": "tc001", "quantity": 2, "personalization": "Feliz cumple" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["quantity"], 2);

    let (status, body) = register(&app, "ana@gmail.com", "1970-01-01").await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["user"]["discount_percent"], 50);

    let (status, body) = Call::new("POST", "/api/auth/login")
        .json(json!({ "email": "ana@gmail.com", "password": "secret", "guest_cart_id": session }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["cart_migrated"], true);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert!(token.starts_with("Bearer "));

    let (status, body) = Call::new("GET", "/api/carrito").token(&token).send(&app).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["item_count"], 2);
    assert_eq!(body["data"]["summary"]["subtotal"], 90000);
    assert_eq!(body["data"]["summary"]["discount"], 45000);
    assert_eq!(body["data"]["summary"]["total"], 45000);

    // The guest cart is gone once it has been carried over.
    let (_, body) = Call::new("GET", "/api/carrito").session(session).send(&app).await?;
    assert_eq!(body["data"]["item_count"], 0);

    let (status, body) = Call::new("POST", "/api/pedidos")
        .token(&token)
        .json(json!({ "payment_method": "cash", "delivery_address": "Av. Matta 100, Santiago" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["order"]["status"], "pending");
    assert_eq!(body["data"]["order"]["total"], 45000);
    assert_eq!(body["data"]["items"][0]["personalization"], "Feliz cumple");
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let (_, body) = Call::new("GET", "/api/productos/TC001").send(&app).await?;
    assert_eq!(body["data"]["stock"], 8);

    let (_, body) = Call::new("GET", "/api/carrito").token(&token).send(&app).await?;
    assert_eq!(body["data"]["item_count"], 0);

    let (_, body) = Call::new("GET", "/api/usuarios/perfil").token(&token).send(&app).await?;
    assert_eq!(
        body["data"]["addresses"][0],
        "Los Carrera 50, Santiago, Región Metropolitana de Santiago"
    );
    assert_eq!(body["data"]["addresses"][1], "Av. Matta 100, Santiago");

    let (status, body) = Call::new("GET", "/api/pedidos").token(&token).send(&app).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);

    let uri = format!("/api/pedidos/{order_id}/cancelar");
    let (status, body) = Call::new("POST", &uri).token(&token).send(&app).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "cancelled");

    let (_, body) = Call::new("GET", "/api/productos/TC001").send(&app).await?;
    assert_eq!(body["data"]["stock"], 10);

    let (status, _) = Call::new("POST", &uri).token(&token).send(&app).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn orders_are_private_to_their_owner() -> anyhow::Result<()> {
    let app = seeded_app().await?;
    register(&app, "ana@gmail.com", "1990-01-01").await?;
    register(&app, "beto@gmail.com", "1990-01-01").await?;
    let ana = login(&app, "ana@gmail.com", "secret").await?;
    let beto = login(&app, "beto@gmail.com", "secret").await?;

    Call::new("POST", "/api/carrito")
        .token(&ana)
        .json(json!({ "product_id": "PT001", "quantity": 1 }))
        .send(&app)
        .await?;
    let (status, body) = Call::new("POST", "/api/pedidos")
        .token(&ana)
        .json(json!({ "payment_method": "cash", "delivery_address": "Calle 1, Santiago" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    let order_id = body["data"]["order"]["id"].as_str().unwrap().to_string();

    let (status, _) = Call::new("GET", &format!("/api/pedidos/{order_id}"))
        .token(&beto)
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = Call::new("GET", &format!("/api/pedidos/{order_id}"))
        .token(&ana)
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn authentication_failures() -> anyhow::Result<()> {
    let app = seeded_app().await?;

    let (status, _) = Call::new("GET", "/api/pedidos").send(&app).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = Call::new("GET", "/api/carrito")
        .token("Bearer not-a-jwt")
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = Call::new("POST", "/api/auth/login")
        .json(json!({ "email": "nobody@gmail.com", "password": "secret" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["data"]["error"], "Unauthorized Invalid email or password");

    let (status, _) = Call::new("POST", "/api/carrito")
        .json(json!({ "product_id": "TC001" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn registration_rules() -> anyhow::Result<()> {
    let app = seeded_app().await?;

    let (status, body) = register(&app, "ana@duocuc.cl", "2000-01-01").await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["is_student"], true);

    let (status, body) = register(&app, "ANA@duocuc.cl", "2000-01-01").await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email is already registered");

    let (status, body) = register(&app, "boss@admin.cl", "2000-01-01").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["fields"]["email"].is_string());

    let (status, body) = register(&app, "kid@gmail.com", "2015-01-01").await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["fields"]["birth_date"].is_string());

    // Leaving out the birth date does not skip the age check.
    let (status, body) = Call::new("POST", "/api/auth/register")
        .json(json!({ "name": "Kid", "email": "kid@gmail.com", "password": "secret" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["data"]["fields"]["birth_date"], "birth date is required");
    assert_eq!(body["data"]["fields"]["phone"], "phone is required");
    assert_eq!(body["data"]["fields"]["address"], "a delivery address is required");
    let (status, _) = Call::new("POST", "/api/auth/login")
        .json(json!({ "email": "kid@gmail.com", "password": "secret" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn revoked_staff_rights_apply_to_live_tokens() -> anyhow::Result<()> {
    let app = seeded_app().await?;
    register(&app, "ana@gmail.com", "1990-01-01").await?;
    let admin = login(&app, ADMIN_ACCOUNT_EMAIL, "admin").await?;

    let (status, _) = Call::new("PATCH", "/api/admin/usuarios/ana@gmail.com/rol")
        .token(&admin)
        .json(json!({ "role": "admin" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let ana = login(&app, "ana@gmail.com", "secret").await?;
    let (status, _) = Call::new("GET", "/api/admin/usuarios").token(&ana).send(&app).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = Call::new("PATCH", "/api/admin/usuarios/ana@gmail.com/rol")
        .token(&admin)
        .json(json!({ "role": "user" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);

    // The token still says admin, the account no longer does.
    let (status, _) = Call::new("GET", "/api/admin/usuarios").token(&ana).send(&app).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let own = format!("/api/admin/usuarios/{ADMIN_ACCOUNT_EMAIL}");
    let (status, _) = Call::new("PATCH", &format!("{own}/rol"))
        .token(&ana)
        .json(json!({ "role": "user" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = Call::new("GET", &own).token(&admin).send(&app).await?;
    assert_eq!(body["data"]["role"], "admin");

    let (status, _) = Call::new("DELETE", "/api/admin/usuarios/ana@gmail.com")
        .token(&admin)
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = Call::new("GET", "/api/auth/verify").token(&ana).send(&app).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = Call::new("GET", "/api/carrito").token(&ana).send(&app).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn staff_endpoints_are_guarded() -> anyhow::Result<()> {
    let app = seeded_app().await?;
    register(&app, "ana@gmail.com", "1990-01-01").await?;
    let user = login(&app, "ana@gmail.com", "secret").await?;
    let admin = login(&app, ADMIN_ACCOUNT_EMAIL, "admin").await?;

    let (status, _) = Call::new("GET", "/api/admin/usuarios").token(&user).send(&app).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = Call::new("GET", "/api/admin/usuarios").token(&admin).send(&app).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 3);

    let system = format!("/api/admin/usuarios/{SYSTEM_ACCOUNT_EMAIL}");
    let (status, _) = Call::new("DELETE", &system).token(&admin).send(&app).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = Call::new("PUT", &system)
        .token(&admin)
        .json(json!({ "name": "Renamed" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = Call::new("PATCH", &format!("{system}/rol"))
        .token(&admin)
        .json(json!({ "role": "user" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = Call::new("PATCH", "/api/admin/usuarios/ana@gmail.com/rol")
        .token(&admin)
        .json(json!({ "rol": "admin" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["role"], "admin");

    let (status, _) = Call::new("PATCH", "/api/admin/usuarios/ana@gmail.com/rol")
        .token(&admin)
        .json(json!({ "role": "system" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let own = format!("/api/admin/usuarios/{ADMIN_ACCOUNT_EMAIL}");
    let (status, _) = Call::new("DELETE", &own).token(&admin).send(&app).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn admin_manages_catalog_and_inventory() -> anyhow::Result<()> {
    let app = seeded_app().await?;
    let admin = login(&app, ADMIN_ACCOUNT_EMAIL, "admin").await?;

    let (status, body) = Call::new("POST", "/api/admin/productos")
        .token(&admin)
        .json(json!({
            "codigo": "tk001",
            "name": "Torta de Kuchen",
            "price": 12000,
            "category": "Pastelería Tradicional",
            "stock": 3,
        }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["id"], "TK001");

    let (status, _) = Call::new("POST", "/api/admin/productos")
        .token(&admin)
        .json(json!({ "codigo": "TK001", "name": "Dup", "price": 1, "category": "X" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = Call::new("POST", "/api/admin/productos")
        .token(&admin)
        .json(json!({ "name": "", "price": 0, "category": "" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    for field in ["name", "price", "category"] {
        assert!(body["data"]["fields"][field].is_string(), "missing {field}");
    }

    let (status, body) = Call::new("PATCH", "/api/admin/inventario/TK001")
        .token(&admin)
        .json(json!({ "delta": -2 }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 1);

    let (status, _) = Call::new("PATCH", "/api/admin/inventario/TK001")
        .token(&admin)
        .json(json!({ "delta": -5 }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = Call::new("GET", "/api/admin/inventario/stock-bajo?umbral=1")
        .token(&admin)
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["id"], "TK001");

    let (status, body) = Call::new("PATCH", "/api/admin/productos/TK001/stock")
        .token(&admin)
        .json(json!({ "nuevoStock": 40 }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stock"], 40);

    let (status, body) = Call::new("PUT", "/api/admin/productos/TK001")
        .token(&admin)
        .json(json!({ "price": 13000 }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], 13000);

    let (status, _) = Call::new("DELETE", "/api/admin/productos/TK001")
        .token(&admin)
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = Call::new("GET", "/api/productos/TK001").send(&app).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn checkout_fails_when_stock_ran_out() -> anyhow::Result<()> {
    let app = seeded_app().await?;
    let admin = login(&app, ADMIN_ACCOUNT_EMAIL, "admin").await?;
    register(&app, "ana@gmail.com", "1990-01-01").await?;
    let user = login(&app, "ana@gmail.com", "secret").await?;

    Call::new("POST", "/api/carrito")
        .token(&user)
        .json(json!({ "product_id": "PSA002", "quantity": 4 }))
        .send(&app)
        .await?;
    Call::new("PATCH", "/api/admin/productos/PSA002/stock")
        .token(&admin)
        .json(json!({ "stock": 2 }))
        .send(&app)
        .await?;

    let (status, body) = Call::new("POST", "/api/pedidos")
        .token(&user)
        .json(json!({ "payment_method": "cash", "delivery_address": "Calle 1, Santiago" }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    // Nothing was taken from stock and the cart is intact.
    let (_, body) = Call::new("GET", "/api/productos/PSA002").send(&app).await?;
    assert_eq!(body["data"]["stock"], 2);
    let (_, body) = Call::new("GET", "/api/carrito").token(&user).send(&app).await?;
    assert_eq!(body["data"]["item_count"], 4);
    Ok(())
}

#[tokio::test]
async fn card_payment_keeps_only_last_four_digits() -> anyhow::Result<()> {
    let app = seeded_app().await?;
    register(&app, "ana@gmail.com", "1990-01-01").await?;
    let user = login(&app, "ana@gmail.com", "secret").await?;

    Call::new("POST", "/api/carrito")
        .token(&user)
        .json(json!({ "product_id": "P1001", "quantity": 1 }))
        .send(&app)
        .await?;

    let (status, body) = Call::new("POST", "/api/pedidos")
        .token(&user)
        .json(json!({
            "metodoPago": "card",
            "direccionEnvio": "Calle 1, Santiago",
            "card": { "number": "4111111111111111", "expiry": "01/20", "holder": "Ana", "cvv": "123" },
        }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["fields"]["card_expiry"].is_string());

    let (status, body) = Call::new("POST", "/api/pedidos")
        .token(&user)
        .json(json!({
            "payment_method": "card",
            "delivery_address": "Calle 1, Santiago",
            "card": { "number": "4111 1111 1111 4321", "expiry": "12/99", "holder": "Ana Perez", "cvv": "123" },
        }))
        .send(&app)
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["order"]["card_last4"], "4321");
    assert_eq!(body["data"]["order"]["payment_method"], "card");
    Ok(())
}
