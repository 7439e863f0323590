//! Synthetic analytics rows for demos and load testing.

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Builder;

use hr_analytics_core::{QueryRecord, Seniority};

const CATEGORIES: [&str; 8] = [
    "benefits",
    "payroll",
    "leave",
    "policies",
    "onboarding",
    "training",
    "compensation",
    "it_support",
];

const DEPARTMENTS: [&str; 6] = ["HR", "IT", "Finance", "Engineering", "Sales", "Operations"];

const SENIORITY: [Seniority; 4] = [
    Seniority::Junior,
    Seniority::Mid,
    Seniority::Senior,
    Seniority::Unknown,
];

/// Queries per simulated user, on average.
const QUERIES_PER_USER: usize = 5;

struct Persona {
    user_id: String,
    department: &'static str,
    seniority: Seniority,
    new_user: bool,
}

/// Generate `count` rows spread uniformly over `[now - days, now)`.
///
/// Users keep a stable department and seniority across their rows.
pub fn synthetic_records<R: Rng>(
    rng: &mut R,
    count: usize,
    days: u32,
    now: DateTime<Utc>,
) -> Vec<QueryRecord> {
    let span_ms = i64::from(days.max(1)) * 86_400_000;

    let personas: Vec<Persona> = (0..(count / QUERIES_PER_USER).max(1))
        .map(|_| Persona {
            user_id: Builder::from_random_bytes(rng.gen()).into_uuid().to_string(),
            department: DEPARTMENTS.choose(rng).copied().unwrap_or("HR"),
            seniority: SENIORITY.choose(rng).copied().unwrap_or_default(),
            new_user: rng.gen_bool(0.2),
        })
        .collect();

    (0..count)
        .filter_map(|_| {
            let persona = personas.choose(rng)?;
            let timestamp = now - Duration::milliseconds(rng.gen_range(1..=span_ms));
            let answered = timestamp + Duration::milliseconds(rng.gen_range(500..30_000));

            let mut record = QueryRecord::new(persona.user_id.clone(), timestamp)
                .with_category(CATEGORIES.choose(rng).copied().unwrap_or("benefits"))
                .with_resolved(rng.gen_bool(0.7))
                .with_response(timestamp, answered)
                .with_department(persona.department)
                .with_seniority(persona.seniority)
                .with_new_user(persona.new_user);

            // Not every user leaves a rating.
            if rng.gen_bool(0.85) {
                record = record.with_satisfaction(rng.gen_range(1..=5));
            }

            Some(record)
        })
        .collect()
}
