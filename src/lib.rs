pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod middleware;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::auth_service::AuthService;
use application::catalog_service::CatalogService;
use application::dashboard_service::DashboardService;
use application::order_service::OrderService;
use application::user_service::UserService;
use infrastructure::catalog_repo::DieselCatalogRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::session_store::DieselSessionStore;
use infrastructure::user_repo::DieselUserRepository;
use middleware::RoleGuard;

pub use db::{create_pool, DbPool};

pub type AppAuthService = AuthService<DieselUserRepository, DieselSessionStore>;
pub type AppUserService = UserService<DieselUserRepository>;
pub type AppCatalogService = CatalogService<DieselCatalogRepository>;
pub type AppOrderService = OrderService<DieselOrderRepository, DieselUserRepository>;
pub type AppDashboardService =
    DashboardService<DieselOrderRepository, DieselCatalogRepository, DieselUserRepository>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

/// Create the first admin account unless one already exists. Returns
/// whether a user was created.
pub fn ensure_initial_admin(
    pool: &DbPool,
    username: &str,
    email: &str,
    password: &str,
) -> Result<bool, domain::errors::DomainError> {
    let auth = AuthService::new(
        DieselUserRepository::new(pool.clone()),
        DieselSessionStore::new(pool.clone()),
    );
    auth.ensure_initial_admin(username, email, password)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::login,
        handlers::auth::register,
        handlers::auth::logout,
        handlers::catalog::storefront,
        handlers::catalog::list_products,
        handlers::catalog::list_categories,
        handlers::catalog::product_detail,
        handlers::customer::view_cart,
        handlers::customer::add_to_cart,
        handlers::customer::update_cart,
        handlers::customer::remove_from_cart,
        handlers::customer::clear_cart,
        handlers::customer::checkout,
        handlers::customer::my_orders,
        handlers::customer::my_order_detail,
        handlers::employee::dashboard,
        handlers::employee::list_orders,
        handlers::employee::order_detail,
        handlers::employee::create_order,
        handlers::employee::edit_order,
        handlers::employee::accept_order,
        handlers::employee::deliver_order,
        handlers::employee::cancel_order,
        handlers::employee::pay_order,
        handlers::employee::list_customers,
        handlers::employee::list_products,
        handlers::employee::inventory,
        handlers::admin::dashboard,
        handlers::admin::reports,
        handlers::admin::list_categories,
        handlers::admin::add_category,
        handlers::admin::edit_category,
        handlers::admin::delete_category,
        handlers::admin::list_products,
        handlers::admin::add_product,
        handlers::admin::edit_product,
        handlers::admin::delete_product,
        handlers::admin::inventory,
        handlers::admin::set_stock,
        handlers::admin::adjust_stock,
        handlers::admin::list_orders,
        handlers::admin::list_customers,
        handlers::admin::create_customer,
        handlers::admin::edit_customer,
        handlers::admin::delete_customer,
        handlers::admin::list_employees,
        handlers::admin::create_employee,
        handlers::admin::edit_employee,
        handlers::admin::delete_employee,
    ),
    components(schemas(
        handlers::auth::LoginBody,
        handlers::auth::RegisterBody,
        handlers::catalog::SearchParams,
        handlers::customer::CartItemBody,
        handlers::customer::CartRemoveBody,
        handlers::customer::CartLineResponse,
        handlers::customer::CartResponse,
        handlers::employee::EmployeeDashboardResponse,
        handlers::employee::WalkinBody,
        handlers::employee::CreateOrderBody,
        handlers::employee::EditOrderBody,
        handlers::employee::OrderListQuery,
        handlers::admin::AdminDashboardResponse,
        handlers::admin::CategoryWithCountResponse,
        handlers::admin::CategoryBody,
        handlers::admin::ProductBody,
        handlers::admin::StockBody,
        handlers::admin::RestockBody,
        handlers::admin::ContactBody,
        handlers::admin::SalesReportResponse,
        handlers::admin::TopProductEntry,
        handlers::admin::TopCustomerEntry,
        handlers::admin::CategoryCountEntry,
        handlers::admin::StatusCountEntry,
        handlers::dto::ProductResponse,
        handlers::dto::CategoryResponse,
        handlers::dto::UserResponse,
        handlers::dto::OrderLineResponse,
        handlers::dto::OrderResponse,
        handlers::dto::OrderListResponse,
        handlers::dto::ListParams,
        handlers::dto::OrderLineBody,
    )),
    tags(
        (name = "auth", description = "Login, registration and session management"),
        (name = "catalog", description = "Public product and category browsing"),
        (name = "cart", description = "Session cart and checkout"),
        (name = "orders", description = "Customer order history"),
        (name = "employee", description = "Order lifecycle and store operations"),
        (name = "admin", description = "Administrative CRUD and reporting"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let auth = web::Data::new(AuthService::new(
        DieselUserRepository::new(pool.clone()),
        DieselSessionStore::new(pool.clone()),
    ));
    let users = web::Data::new(UserService::new(DieselUserRepository::new(pool.clone())));
    let catalog = web::Data::new(CatalogService::new(DieselCatalogRepository::new(
        pool.clone(),
    )));
    let orders = web::Data::new(OrderService::new(
        DieselOrderRepository::new(pool.clone()),
        DieselUserRepository::new(pool.clone()),
    ));
    let dashboards = web::Data::new(DashboardService::new(
        DieselOrderRepository::new(pool.clone()),
        DieselCatalogRepository::new(pool.clone()),
        DieselUserRepository::new(pool),
    ));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(auth.clone())
            .app_data(users.clone())
            .app_data(catalog.clone())
            .app_data(orders.clone())
            .app_data(dashboards.clone())
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .route("/login", web::get().to(handlers::auth::login_page))
            .route("/login", web::post().to(handlers::auth::login))
            .route("/register", web::post().to(handlers::auth::register))
            .route("/logout", web::post().to(handlers::auth::logout))
            .service(
                web::scope("/cliente")
                    // Guest-accessible catalog browsing.
                    .route("/index", web::get().to(handlers::catalog::storefront))
                    .route("/productos", web::get().to(handlers::catalog::list_products))
                    .route(
                        "/categorias",
                        web::get().to(handlers::catalog::list_categories),
                    )
                    .route(
                        "/producto/{id}",
                        web::get().to(handlers::catalog::product_detail),
                    )
                    .service(
                        web::scope("")
                            .wrap(RoleGuard::customer())
                            .route("/carrito", web::get().to(handlers::customer::view_cart))
                            .route(
                                "/carrito/agregar",
                                web::post().to(handlers::customer::add_to_cart),
                            )
                            .route(
                                "/carrito/actualizar",
                                web::post().to(handlers::customer::update_cart),
                            )
                            .route(
                                "/carrito/eliminar",
                                web::post().to(handlers::customer::remove_from_cart),
                            )
                            .route(
                                "/carrito/vaciar",
                                web::post().to(handlers::customer::clear_cart),
                            )
                            .route("/checkout", web::post().to(handlers::customer::checkout))
                            .route(
                                "/mis_pedidos",
                                web::get().to(handlers::customer::my_orders),
                            )
                            .route(
                                "/pedidos/{id}",
                                web::get().to(handlers::customer::my_order_detail),
                            ),
                    ),
            )
            .service(
                web::scope("/empleado")
                    .wrap(RoleGuard::staff())
                    .route("/", web::get().to(handlers::employee::dashboard))
                    .route("/pedidos", web::get().to(handlers::employee::list_orders))
                    .route(
                        "/pedidos/aceptar/{id}",
                        web::post().to(handlers::employee::accept_order),
                    )
                    .route(
                        "/pedidos/entregar/{id}",
                        web::post().to(handlers::employee::deliver_order),
                    )
                    .route(
                        "/pedidos/cancelar/{id}",
                        web::post().to(handlers::employee::cancel_order),
                    )
                    .route(
                        "/pedidos/pagar/{id}",
                        web::post().to(handlers::employee::pay_order),
                    )
                    .route(
                        "/pedidos/editar/{id}",
                        web::post().to(handlers::employee::edit_order),
                    )
                    .route(
                        "/pedidos/{id}",
                        web::get().to(handlers::employee::order_detail),
                    )
                    .route(
                        "/crear_pedido",
                        web::post().to(handlers::employee::create_order),
                    )
                    .route(
                        "/clientes",
                        web::get().to(handlers::employee::list_customers),
                    )
                    .route(
                        "/productos",
                        web::get().to(handlers::employee::list_products),
                    )
                    .route("/inventario", web::get().to(handlers::employee::inventory)),
            )
            .service(
                web::scope("/admin")
                    .wrap(RoleGuard::admin())
                    .route("/", web::get().to(handlers::admin::dashboard))
                    .route("/reportes", web::get().to(handlers::admin::reports))
                    .route("/categorias", web::get().to(handlers::admin::list_categories))
                    .route(
                        "/categorias/agregar",
                        web::post().to(handlers::admin::add_category),
                    )
                    .route(
                        "/categorias/editar/{id}",
                        web::post().to(handlers::admin::edit_category),
                    )
                    .route(
                        "/categorias/eliminar/{id}",
                        web::post().to(handlers::admin::delete_category),
                    )
                    .route("/productos", web::get().to(handlers::admin::list_products))
                    .route(
                        "/productos/agregar",
                        web::post().to(handlers::admin::add_product),
                    )
                    .route(
                        "/productos/editar/{id}",
                        web::post().to(handlers::admin::edit_product),
                    )
                    .route(
                        "/productos/eliminar/{id}",
                        web::post().to(handlers::admin::delete_product),
                    )
                    .route("/inventario", web::get().to(handlers::admin::inventory))
                    .route(
                        "/inventario/actualizar",
                        web::post().to(handlers::admin::set_stock),
                    )
                    .route(
                        "/inventario/ajustar",
                        web::post().to(handlers::admin::adjust_stock),
                    )
                    .route("/pedidos", web::get().to(handlers::admin::list_orders))
                    .route("/clientes", web::get().to(handlers::admin::list_customers))
                    .route("/clientes", web::post().to(handlers::admin::create_customer))
                    .route(
                        "/clientes/editar/{id}",
                        web::post().to(handlers::admin::edit_customer),
                    )
                    .route(
                        "/clientes/eliminar/{id}",
                        web::post().to(handlers::admin::delete_customer),
                    )
                    .route("/empleados", web::get().to(handlers::admin::list_employees))
                    .route(
                        "/empleados",
                        web::post().to(handlers::admin::create_employee),
                    )
                    .route(
                        "/empleados/editar/{id}",
                        web::post().to(handlers::admin::edit_employee),
                    )
                    .route(
                        "/empleados/eliminar/{id}",
                        web::post().to(handlers::admin::delete_employee),
                    ),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
