use chrono::{Duration, Utc};
use clap::Parser;
use fake::faker::name::en::Name;
use fake::Fake;
use sqlx::sqlite::SqlitePoolOptions;

use ferrofit::{
    auth::AuthService,
    domain::{CreatePaymentRequest, CreatePlanRequest, CreateStaffRequest, PaymentStatus},
    repository::{
        CheckinRepository, NewUser, PaymentRepository, PlanRepository, SqliteCheckinRepository,
        SqlitePaymentRepository, SqlitePlanRepository, SqliteStaffRepository,
        SqliteUserRepository, StaffRepository, UserRepository,
    },
    service::StatusService,
};

#[derive(Parser)]
#[command(about = "Seed the database with development data")]
struct Args {
    /// Database URL (falls back to DATABASE_URL, then sqlite://ferrofit.db)
    #[arg(long)]
    database_url: Option<String>,

    /// How many members to create per payment-age cohort
    #[arg(long, default_value_t = 3)]
    per_cohort: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let database_url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| "sqlite://ferrofit.db".to_string());

    println!("Seeding {database_url}...");

    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&db_pool).await?;

    let user_repo = SqliteUserRepository::new(db_pool.clone());
    let plan_repo = SqlitePlanRepository::new(db_pool.clone());
    let payment_repo = SqlitePaymentRepository::new(db_pool.clone());
    let checkin_repo = SqliteCheckinRepository::new(db_pool.clone());
    let staff_repo = SqliteStaffRepository::new(db_pool.clone());
    let status_service = StatusService::new(db_pool.clone());

    // Plans
    println!("Creating plans...");
    let monthly = plan_repo
        .create(CreatePlanRequest {
            name: "Mensal".to_string(),
            description: "Acesso ilimitado durante 30 dias".to_string(),
            price: 99.90,
            checkin_limit: 0,
        })
        .await?;
    let basic = plan_repo
        .create(CreatePlanRequest {
            name: "Básico".to_string(),
            description: "Até 12 visitas por mês".to_string(),
            price: 59.90,
            checkin_limit: 12,
        })
        .await?;

    // Staff
    println!("Creating staff (admin@ferrofit.local / admin123)...");
    let admin_hash = AuthService::hash_password("admin123").await?;
    staff_repo
        .create(
            CreateStaffRequest {
                name: "Admin".to_string(),
                email: "admin@ferrofit.local".to_string(),
                password: String::new(), // hash passed separately
                role: "gerente".to_string(),
            },
            admin_hash,
        )
        .await?;

    // Members across every payment-age cohort the reconciler cares
    // about: fresh, late, inactive, lapsed, and never paid.
    let cohorts: &[(&str, Option<i64>)] = &[
        ("paid recently", Some(5)),
        ("late", Some(40)),
        ("inactive", Some(70)),
        ("lapsed", Some(120)),
        ("never paid", None),
    ];

    let password_hash = AuthService::hash_password("senha123").await?;
    let mut member_number = 0;

    for (label, age_days) in cohorts {
        println!("Creating {} members ({label})...", args.per_cohort);

        for _ in 0..args.per_cohort {
            member_number += 1;
            let name: String = Name().fake();
            let email = format!("membro{member_number}@example.com");

            let user = user_repo
                .create(NewUser {
                    name,
                    email,
                    password_hash: password_hash.clone(),
                })
                .await?;

            let plan = if user.id % 2 == 0 { &monthly } else { &basic };

            if let Some(age) = age_days {
                let payment_date = Utc::now() - Duration::days(*age);
                let mut conn = db_pool.acquire().await?;
                payment_repo
                    .create_on(
                        &mut conn,
                        CreatePaymentRequest {
                            user_id: user.id,
                            plan_id: plan.id,
                            status: PaymentStatus::Paid,
                            payment_date,
                            due_date: payment_date + Duration::days(30),
                            gateway_charge_id: None,
                        },
                    )
                    .await?;
                user_repo.set_plan_on(&mut conn, user.id, plan.id).await?;

                // Recent payers get a few visits on record.
                if *age < 30 {
                    for _ in 0..3 {
                        checkin_repo.create(user.id).await?;
                    }
                }
            } else {
                let mut conn = db_pool.acquire().await?;
                user_repo.set_plan_on(&mut conn, user.id, plan.id).await?;
            }

            status_service.reconcile_user(user.id).await?;
        }
    }

    println!("Done.");
    Ok(())
}
