use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            Bucket, DashboardSummary, LowStockQuery, SalesPoint, SalesQuery, SalesSeries,
            StatusCount, TopProduct, TopProductsQuery,
        },
        auth::{AddressInput, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse},
        cart::{AddToCartRequest, CartItemDto, CartLineUpdate, CartView, UpdateCartItemRequest},
        orders::{CardDetails, CheckoutRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            CategoryList, CreateProductRequest, InventoryAdjustRequest, ProductDto, ProductList,
            SetStockRequest, UpdateProductRequest,
        },
        users::{
            AddressRequest, AdminUpdateUserRequest, ChangePasswordRequest, ChangeRoleRequest,
            UpdateProfileRequest, UserList, UserProfile,
        },
    },
    models::{Order, OrderItem, OrderStatus, PaymentMethod, Role},
    pricing::PriceBreakdown,
    response::{ApiResponse, Meta},
    routes::{admin, auth, cart, health, orders, params, products, profile},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::verify,
        profile::get_profile,
        profile::update_profile,
        profile::change_password,
        profile::add_address,
        profile::remove_address,
        products::list_products,
        products::list_categories,
        products::get_product,
        cart::view_cart,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        admin::create_product,
        admin::update_product,
        admin::delete_product,
        admin::set_stock,
        admin::list_low_stock,
        admin::adjust_inventory,
        admin::list_users,
        admin::get_user,
        admin::update_user,
        admin::delete_user,
        admin::change_role,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::summary,
        admin::sales,
        admin::popular_products,
        admin::orders_by_status
    ),
    components(
        schemas(
            Role,
            OrderStatus,
            PaymentMethod,
            Order,
            OrderItem,
            PriceBreakdown,
            AddressInput,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            LoginResponse,
            UserProfile,
            UpdateProfileRequest,
            ChangePasswordRequest,
            AddressRequest,
            AdminUpdateUserRequest,
            ChangeRoleRequest,
            UserList,
            ProductDto,
            ProductList,
            CategoryList,
            CreateProductRequest,
            UpdateProductRequest,
            SetStockRequest,
            InventoryAdjustRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartItemDto,
            CartView,
            CartLineUpdate,
            CardDetails,
            CheckoutRequest,
            OrderWithItems,
            OrderList,
            UpdateOrderStatusRequest,
            LowStockQuery,
            Bucket,
            SalesQuery,
            SalesPoint,
            SalesSeries,
            TopProductsQuery,
            TopProduct,
            StatusCount,
            DashboardSummary,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            params::AdminOrderQuery,
            params::UserListQuery,
            params::SortOrder,
            params::ProductSortBy,
            health::HealthData,
            Meta,
            ApiResponse<ProductDto>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<UserProfile>,
            ApiResponse<UserList>,
            ApiResponse<DashboardSummary>,
            ApiResponse<SalesSeries>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and session endpoints"),
        (name = "Profile", description = "Own account endpoints"),
        (name = "Products", description = "Public catalog endpoints"),
        (name = "Cart", description = "Cart endpoints for guests and signed-in users"),
        (name = "Orders", description = "Checkout and order history endpoints"),
        (name = "Admin", description = "Staff endpoints"),
        (name = "Stats", description = "Staff dashboard endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
