//! Fulfillment against a live Postgres database
//!
//! Skipped unless `DATABASE_URL` points at a database the tests may
//! migrate and write to. Every run seeds its own product, warehouse and
//! customer, so runs never share stock.

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use parts_ledger::services::sales_order::CreateSalesOrderInput;
use parts_ledger::services::SalesOrderService;
use parts_ledger::store::PgLedgerStore;
use parts_ledger::AppError;
use shared::LineItemInput;

const ACTOR: i64 = 9;

async fn connect() -> Option<PgPool> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping Postgres tests");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&url)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Some(pool)
}

struct Seeded {
    product_id: i64,
    customer_id: i64,
}

async fn seed(pool: &PgPool, quantity: i32) -> Seeded {
    let suffix = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let product_id: i64 =
        sqlx::query_scalar("INSERT INTO products (name) VALUES ($1) RETURNING id")
            .bind(format!("Bracket {suffix}"))
            .fetch_one(pool)
            .await
            .unwrap();
    let warehouse_id: i64 =
        sqlx::query_scalar("INSERT INTO warehouses (name) VALUES ($1) RETURNING id")
            .bind(format!("Bay {suffix}"))
            .fetch_one(pool)
            .await
            .unwrap();
    let customer_id: i64 =
        sqlx::query_scalar("INSERT INTO customers (name) VALUES ($1) RETURNING id")
            .bind(format!("Customer {suffix}"))
            .fetch_one(pool)
            .await
            .unwrap();
    sqlx::query("INSERT INTO inventory (product_id, warehouse_id, quantity) VALUES ($1, $2, $3)")
        .bind(product_id)
        .bind(warehouse_id)
        .bind(quantity)
        .execute(pool)
        .await
        .unwrap();
    Seeded {
        product_id,
        customer_id,
    }
}

async fn confirmed_order(
    service: &SalesOrderService<PgLedgerStore>,
    seeded: &Seeded,
    quantity: i32,
) -> i64 {
    let order = service
        .create(
            ACTOR,
            CreateSalesOrderInput {
                customer_id: seeded.customer_id,
                items: vec![LineItemInput {
                    product_id: seeded.product_id,
                    quantity,
                    unit_price: rust_decimal::Decimal::new(250, 2),
                }],
            },
        )
        .await
        .unwrap();
    service.approve(ACTOR, order.sales_order.id).await.unwrap();
    order.sales_order.id
}

async fn stock(pool: &PgPool, product_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COALESCE(SUM(quantity), 0)::BIGINT FROM inventory WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_row_locks_prevent_overselling() {
    let Some(pool) = connect().await else {
        return;
    };
    let seeded = seed(&pool, 10).await;
    let store = PgLedgerStore::new(pool.clone());
    let service = SalesOrderService::new(store.clone());
    let first = confirmed_order(&service, &seeded, 6).await;
    let second = confirmed_order(&service, &seeded, 6).await;

    let a = SalesOrderService::new(store.clone());
    let b = SalesOrderService::new(store);
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.process(ACTOR, first).await }),
        tokio::spawn(async move { b.process(ACTOR, second).await }),
    );
    let results = [ra.unwrap(), rb.unwrap()];

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .any(|r| matches!(r, Err(AppError::InsufficientStock { .. }))));
    assert_eq!(stock(&pool, seeded.product_id).await, 4);
}
