use bakery_service::{build_server, create_pool, ensure_initial_admin, run_migrations};
use dotenvy::dotenv;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("PORT must be a valid number");

    let pool = create_pool(&database_url);
    run_migrations(&pool);

    let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".to_string());
    let admin_email =
        env::var("ADMIN_EMAIL").unwrap_or_else(|_| "admin@pasteleria.com".to_string());
    let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
    let created = ensure_initial_admin(&pool, &admin_username, &admin_email, &admin_password)
        .expect("Failed to ensure the initial admin user");
    if created {
        log::info!("Created initial admin user '{}'", admin_username);
    }

    log::info!("Starting server at http://{}:{}", host, port);

    build_server(pool, &host, port)?.await
}
