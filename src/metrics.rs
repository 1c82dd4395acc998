use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{opts, register_int_counter, Encoder, IntCounter, TextEncoder};

pub static LISTINGS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "zerowaste_listings_created_total",
        "Total number of food listings posted"
    ))
    .unwrap()
});

pub static LISTINGS_CLAIMED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "zerowaste_listings_claimed_total",
        "Total number of listings claimed (self-pickup or delivery request)"
    ))
    .unwrap()
});

pub static DELIVERIES_ACCEPTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "zerowaste_deliveries_accepted_total",
        "Total number of delivery requests accepted by volunteers"
    ))
    .unwrap()
});

pub static TIPS_GENERATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(opts!(
        "zerowaste_tips_generated_total",
        "Total number of AI food tips generated"
    ))
    .unwrap()
});

pub fn gather_metrics() -> Result<String> {
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder.encode(&metric_families, &mut buffer)?;

    Ok(String::from_utf8(buffer)?)
}
