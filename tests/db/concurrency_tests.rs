//! Concurrency Tests
//!
//! Races the repositories against a real PostgreSQL. Each test returns early
//! when `TEST_DATABASE_URL` is not set.

use std::sync::Arc;

use chrono::{DateTime, Duration, DurationRound, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use turnoya_api::domain::{
    Appointment, AppointmentRepository, AppointmentStatus, AppointmentStatusHistory, ChangedBy,
    CustomerCounter, NewAppointment, RefreshToken, RefreshTokenRepository,
};
use turnoya_api::infrastructure::repositories::{
    PgAppointmentRepository, PgRefreshTokenRepository,
};

use crate::common::{test_database, unique_email};

const CONTENDERS: usize = 8;

/// Rows an appointment needs, plus the hour the test books into.
struct Fixture {
    customer_id: Uuid,
    business_id: Uuid,
    service_id: Uuid,
    slot: DateTime<Utc>,
}

async fn insert_user(pool: &PgPool, role: &str) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name, role) \
         VALUES ($1, $2, 'x', 'Test', 'User', $3)",
    )
    .bind(id)
    .bind(unique_email())
    .bind(role)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn insert_service(pool: &PgPool, business_id: Uuid) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO services (id, business_id, name, price, duration_minutes) \
         VALUES ($1, $2, 'Corte', 30000, 30)",
    )
    .bind(id)
    .bind(business_id)
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn fixture(pool: &PgPool) -> Fixture {
    let customer_id = insert_user(pool, "Customer").await;
    let owner_id = insert_user(pool, "BusinessOwner").await;

    let business_id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO businesses (id, owner_id, name, category) VALUES ($1, $2, 'Barbería', 'Barbería')",
    )
    .bind(business_id)
    .bind(owner_id)
    .execute(pool)
    .await
    .unwrap();

    let service_id = insert_service(pool, business_id).await;
    Fixture {
        customer_id,
        business_id,
        service_id,
        slot: (Utc::now() + Duration::days(2))
            .duration_trunc(Duration::hours(1))
            .unwrap(),
    }
}

async fn insert_employee(pool: &PgPool, business_id: Uuid) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query(
        "INSERT INTO employees (id, business_id, first_name, last_name) VALUES ($1, $2, 'Ana', 'Gómez')",
    )
    .bind(id)
    .bind(business_id)
    .execute(pool)
    .await
    .unwrap();
    id
}

fn pending(
    fixture: &Fixture,
    service_id: Uuid,
    employee_id: Option<Uuid>,
    offset_minutes: i64,
) -> Appointment {
    let start = fixture.slot + Duration::minutes(offset_minutes);
    NewAppointment {
        user_id: fixture.customer_id,
        business_id: fixture.business_id,
        service_id,
        employee_id,
        scheduled_date: start,
        end_date: start + Duration::minutes(30),
        total_amount: Decimal::new(30000, 0),
        deposit_amount: Decimal::ZERO,
        notes: None,
    }
    .into_appointment(Utc::now())
}

fn initial_history(appointment: &Appointment) -> AppointmentStatusHistory {
    AppointmentStatusHistory::new(
        appointment.id,
        None,
        AppointmentStatus::Pending,
        ChangedBy::User,
        None,
    )
}

/// Book every candidate at once and return how many got in.
async fn race_bookings(repo: Arc<PgAppointmentRepository>, candidates: Vec<Appointment>) -> usize {
    let handles: Vec<_> = candidates
        .into_iter()
        .map(|appointment| {
            let repo = repo.clone();
            tokio::spawn(async move {
                let history = initial_history(&appointment);
                repo.create_if_free(&appointment, &history).await.unwrap()
            })
        })
        .collect();

    let mut booked = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            booked += 1;
        }
    }
    booked
}

// ============================================================================
// Booking
// ============================================================================

#[tokio::test]
async fn test_simultaneous_bookings_of_one_slot_insert_one_row() {
    let Some(pool) = test_database().await else {
        return;
    };
    let fixture = fixture(&pool).await;
    let repo = Arc::new(PgAppointmentRepository::new(pool.clone()));

    let candidates = (0..CONTENDERS)
        .map(|i| pending(&fixture, fixture.service_id, None, (i as i64 % 2) * 15))
        .collect();
    assert_eq!(race_bookings(repo, candidates).await, 1);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM appointments WHERE service_id = $1")
        .bind(fixture.service_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_employee_cannot_be_double_booked_across_services() {
    let Some(pool) = test_database().await else {
        return;
    };
    let fixture = fixture(&pool).await;
    let employee_id = insert_employee(&pool, fixture.business_id).await;
    let mut services = vec![fixture.service_id];
    for _ in 1..CONTENDERS {
        services.push(insert_service(&pool, fixture.business_id).await);
    }
    let repo = Arc::new(PgAppointmentRepository::new(pool.clone()));

    let candidates = services
        .into_iter()
        .map(|service_id| pending(&fixture, service_id, Some(employee_id), 0))
        .collect();
    assert_eq!(race_bookings(repo, candidates).await, 1);
}

#[tokio::test]
async fn test_adjacent_slots_both_book() {
    let Some(pool) = test_database().await else {
        return;
    };
    let fixture = fixture(&pool).await;
    let repo = Arc::new(PgAppointmentRepository::new(pool));

    let candidates = vec![
        pending(&fixture, fixture.service_id, None, 0),
        pending(&fixture, fixture.service_id, None, 30),
    ];
    assert_eq!(race_bookings(repo, candidates).await, 2);
}

// ============================================================================
// Status transitions
// ============================================================================

#[tokio::test]
async fn test_complete_and_cancel_race_applies_one() {
    let Some(pool) = test_database().await else {
        return;
    };
    let fixture = fixture(&pool).await;
    let repo = PgAppointmentRepository::new(pool.clone());

    let mut appointment = pending(&fixture, fixture.service_id, None, 0);
    let created = repo
        .create_if_free(&appointment, &initial_history(&appointment))
        .await
        .unwrap()
        .expect("free slot");
    let history = appointment
        .transition(AppointmentStatus::Confirmed, ChangedBy::Business, None)
        .unwrap();
    assert!(repo
        .update_status(&appointment, created.status, &history, None)
        .await
        .unwrap());

    let mut completing = appointment.clone();
    let completed_history = completing
        .transition(AppointmentStatus::Completed, ChangedBy::Business, None)
        .unwrap();
    let mut cancelling = appointment.clone();
    let cancelled_history = cancelling
        .transition(AppointmentStatus::Cancelled, ChangedBy::User, None)
        .unwrap();

    let (completed, cancelled) = tokio::join!(
        repo.update_status(
            &completing,
            AppointmentStatus::Confirmed,
            &completed_history,
            Some(CustomerCounter::Completed),
        ),
        repo.update_status(
            &cancelling,
            AppointmentStatus::Confirmed,
            &cancelled_history,
            None,
        ),
    );
    let (completed, cancelled) = (completed.unwrap(), cancelled.unwrap());
    assert!(completed ^ cancelled);

    let stored = repo.find_by_id(appointment.id).await.unwrap().unwrap();
    let counter: i32 = sqlx::query_scalar("SELECT completed_appointments FROM users WHERE id = $1")
        .bind(fixture.customer_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    if completed {
        assert_eq!(stored.status, AppointmentStatus::Completed);
        assert_eq!(counter, 1);
    } else {
        assert_eq!(stored.status, AppointmentStatus::Cancelled);
        assert_eq!(counter, 0);
    }

    // Initial, confirmed and exactly one of the racing writes.
    assert_eq!(repo.history(appointment.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_stale_transition_changes_nothing() {
    let Some(pool) = test_database().await else {
        return;
    };
    let fixture = fixture(&pool).await;
    let repo = PgAppointmentRepository::new(pool.clone());

    let mut appointment = pending(&fixture, fixture.service_id, None, 0);
    repo.create_if_free(&appointment, &initial_history(&appointment))
        .await
        .unwrap()
        .expect("free slot");
    let history = appointment
        .transition(AppointmentStatus::NoShow, ChangedBy::Business, None)
        .unwrap();

    let applied = repo
        .update_status(
            &appointment,
            AppointmentStatus::Confirmed,
            &history,
            Some(CustomerCounter::NoShow),
        )
        .await
        .unwrap();
    assert!(!applied);

    let no_shows: i32 = sqlx::query_scalar("SELECT no_show_count FROM users WHERE id = $1")
        .bind(fixture.customer_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(no_shows, 0);
    assert_eq!(repo.history(appointment.id).await.unwrap().len(), 1);
}

// ============================================================================
// Refresh tokens
// ============================================================================

#[tokio::test]
async fn test_refresh_token_is_spent_once_under_contention() {
    let Some(pool) = test_database().await else {
        return;
    };
    let user_id = insert_user(&pool, "Customer").await;
    let repo = Arc::new(PgRefreshTokenRepository::new(pool));
    let hash = format!("{:064x}", Uuid::new_v4().as_u128());
    repo.create(&RefreshToken::new(user_id, hash.clone(), Utc::now() + Duration::days(7)))
        .await
        .unwrap();

    let handles: Vec<_> = (0..CONTENDERS)
        .map(|_| {
            let repo = repo.clone();
            let hash = hash.clone();
            tokio::spawn(async move { repo.consume(&hash, user_id).await.unwrap() })
        })
        .collect();
    let mut spent = 0;
    for handle in handles {
        if handle.await.unwrap() {
            spent += 1;
        }
    }
    assert_eq!(spent, 1);
    assert!(!repo.consume(&hash, user_id).await.unwrap());
}

#[tokio::test]
async fn test_expired_refresh_token_is_not_spent() {
    let Some(pool) = test_database().await else {
        return;
    };
    let user_id = insert_user(&pool, "Customer").await;
    let repo = PgRefreshTokenRepository::new(pool);
    let hash = format!("{:064x}", Uuid::new_v4().as_u128());
    repo.create(&RefreshToken::new(user_id, hash.clone(), Utc::now() - Duration::minutes(1)))
        .await
        .unwrap();

    assert!(!repo.consume(&hash, user_id).await.unwrap());
}
