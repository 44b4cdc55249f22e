//! View-model derivation for the FitPass client
//!
//! Pure, side-effect-free transformations from raw API records into the
//! structures the screens render: distance extraction from free-text
//! locations, gym filtering, booking partitioning into current/past/unknown
//! buckets, active-pass selection, and plan pricing with its two independent
//! discount stages. Nothing in this crate performs I/O.

use chrono::{DateTime, Utc};
use fitpass_rust_bookings::Booking;
use fitpass_rust_catalog::{Gym, Plan, Ref};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

const SECONDS_PER_DAY: f64 = 86_400.0;

static DISTANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*km").expect("distance regex"));

/// Extracts the first decimal number followed by the unit token "km" from a
/// free-text location. Unparseable locations count as distance 0, so they
/// pass any distance filter.
pub fn parse_distance_km(location: &str) -> f64 {
    DISTANCE_RE
        .captures(location)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// Filter set applied to the gym listing.
#[derive(Debug, Clone)]
pub struct GymFilter {
    /// Substring matched (lower-cased) against name and location.
    pub search: String,
    /// Upper bound on the distance extracted from the location string.
    pub max_distance_km: f64,
    /// Selected discipline tags; empty means no discipline filtering.
    pub disciplines: Vec<String>,
}

impl Default for GymFilter {
    fn default() -> Self {
        Self {
            search: String::new(),
            max_distance_km: f64::MAX,
            disciplines: Vec::new(),
        }
    }
}

/// Whether a single gym passes the filter set.
pub fn gym_matches(gym: &Gym, filter: &GymFilter) -> bool {
    let needle = filter.search.to_lowercase();
    let searched = needle.is_empty()
        || gym.name.to_lowercase().contains(&needle)
        || gym.location.to_lowercase().contains(&needle);

    let within_distance = parse_distance_km(&gym.location) <= filter.max_distance_km;

    let discipline_ok = filter.disciplines.is_empty()
        || filter.disciplines.iter().any(|selected| {
            gym.specializations
                .iter()
                .any(|tag| tag.eq_ignore_ascii_case(selected))
        });

    searched && within_distance && discipline_ok
}

/// Subset of gyms passing the filter, in their original order.
pub fn filter_gyms<'a>(gyms: &'a [Gym], filter: &GymFilter) -> Vec<&'a Gym> {
    gyms.iter().filter(|gym| gym_matches(gym, filter)).collect()
}

/// Discount badge for a gym card; shown only for strictly positive values.
pub fn discount_badge(gym: &Gym) -> Option<String> {
    if gym.best_discount > 0.0 {
        Some(format!("Up to {}% OFF", gym.best_discount))
    } else {
        None
    }
}

/// Bookings split by status. `unknown` holds statuses outside both the
/// current and past sets; nothing is silently dropped.
#[derive(Debug, Clone, Default)]
pub struct BookingBuckets {
    pub current: Vec<Booking>,
    pub past: Vec<Booking>,
    pub unknown: Vec<Booking>,
}

fn recency(booking: &Booking) -> Option<DateTime<Utc>> {
    booking.created_at.or(booking.start_date)
}

/// Sorts bookings newest-first (creation timestamp, falling back to the
/// start date) and buckets them by status, case-insensitively:
/// active/upcoming are current, completed/cancelled are past, everything
/// else lands in `unknown`.
pub fn partition_bookings(mut bookings: Vec<Booking>) -> BookingBuckets {
    bookings.sort_by(|a, b| recency(b).cmp(&recency(a)));

    let mut buckets = BookingBuckets::default();
    for booking in bookings {
        match booking.status.to_lowercase().as_str() {
            "active" | "upcoming" => buckets.current.push(booking),
            "completed" | "cancelled" => buckets.past.push(booking),
            _ => buckets.unknown.push(booking),
        }
    }
    buckets
}

fn gym_label(reference: Option<&Ref<Gym>>) -> String {
    reference
        .and_then(|r| r.populated())
        .map(|gym| gym.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Gym".to_string())
}

fn plan_label(reference: Option<&Ref<Plan>>) -> String {
    reference
        .and_then(|r| r.populated())
        .map(|plan| plan.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Plan".to_string())
}

/// The currently valid membership, rendered as a QR-code summary card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivePass {
    pub booking_id: String,
    pub gym_name: String,
    pub plan_name: String,
    pub amount: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Signed and not clamped: negative means the pass has expired.
    pub days_remaining: Option<i64>,
}

/// Promotes the most-recently-created current booking to the active pass.
/// Unresolved gym/plan references fall back to placeholder labels.
pub fn active_pass(buckets: &BookingBuckets, now: DateTime<Utc>) -> Option<ActivePass> {
    let booking = buckets.current.first()?;

    let days_remaining = booking
        .end_date
        .map(|end| ((end - now).num_seconds() as f64 / SECONDS_PER_DAY).ceil() as i64);

    Some(ActivePass {
        booking_id: booking.id.clone(),
        gym_name: gym_label(booking.gym.as_ref()),
        plan_name: plan_label(booking.plan.as_ref()),
        amount: booking.amount,
        start_date: booking.start_date,
        end_date: booking.end_date,
        days_remaining,
    })
}

/// Display-ready pricing for one plan. The pre-discount strikethrough
/// (`base_price`) and the day-pass comparison (`day_pass_total`) are two
/// independent stages and are never collapsed into one number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanPricing {
    pub base_price: f64,
    pub final_price: f64,
    pub day_pass_total: f64,
    /// Percent saved versus the day-pass total; present only when the label
    /// should render.
    pub savings_percent: Option<i64>,
    /// "N% EXTRA DISCOUNT" badge; present only for a positive plan discount.
    pub extra_discount_label: Option<String>,
}

/// Derives the pricing view-model from a plan and the gym's single-session
/// (day-pass) price.
pub fn plan_pricing(plan: &Plan, day_pass_price: f64) -> PlanPricing {
    let final_price = (plan.price * (1.0 - plan.discount / 100.0)).round();
    let day_pass_total = day_pass_price * f64::from(plan.sessions);

    let savings_percent = if day_pass_total > final_price {
        let percent = ((1.0 - final_price / day_pass_total) * 100.0).round() as i64;
        (percent > 0).then_some(percent)
    } else {
        None
    };

    let extra_discount_label = if plan.discount > 0.0 {
        Some(format!("{}% EXTRA DISCOUNT", plan.discount))
    } else {
        None
    };

    PlanPricing {
        base_price: plan.price,
        final_price,
        day_pass_total,
        savings_percent,
        extra_discount_label,
    }
}
