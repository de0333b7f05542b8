//! A polled sensor exposing the current power price.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{Context, Error};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::client::PricingApi;
use crate::price::{ChargeSetter, PriceQuote};

/// Attribution reported alongside the sensor value.
pub const ATTRIBUTION: &str = "Data provided by Flick Electric";
/// Display name of the price sensor.
pub const FRIENDLY_NAME: &str = "Flick Power Price";
/// Unit of the sensor value.
pub const UNIT_NAME: &str = "cents";

/// How often a poll-driven host should invoke [`PolledSensor::update`].
pub const SCAN_INTERVAL: Duration = Duration::from_secs(5 * 60);

// Upper bound on a single price fetch; a slower response fails the update.
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

pub const ATTR_ATTRIBUTION: &str = "attribution";
pub const ATTR_FRIENDLY_NAME: &str = "friendly_name";
pub const ATTR_START_AT: &str = "start_at";
pub const ATTR_END_AT: &str = "end_at";

/// A single value in a sensor's attribute map.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(&'static str),
    Time(DateTime<Utc>),
    Amount(f64),
}

/// The capability set a poll-driven host drives a sensor through.
///
/// The host owns scheduling: it calls [`PolledSensor::update`] once per
/// [`PolledSensor::scan_interval`], never concurrently, and decides what to
/// do when an update fails.
#[async_trait]
pub trait PolledSensor {
    /// The sensor's display name.
    fn name(&self) -> &'static str;

    /// The unit label of [`PolledSensor::value`].
    fn unit(&self) -> &'static str;

    /// How often the host should poll [`PolledSensor::update`].
    fn scan_interval(&self) -> Duration;

    /// The current numeric state, or `None` before the first successful
    /// update.
    fn value(&self) -> Option<f64>;

    /// The current attribute map.
    fn attributes(&self) -> &BTreeMap<&'static str, AttributeValue>;

    /// Refresh the sensor state.
    ///
    /// Errors propagate to the host unhandled; the sensor performs no retry
    /// of its own.
    async fn update(&mut self) -> Result<(), Error>;
}

/// Polled sensor for the current Flick power price.
///
/// Holds the most recent [`PriceQuote`] and skips the network entirely while
/// that quote's validity window is still current, so a 5-minute poll cadence
/// results in roughly one fetch per half-hour pricing period. The attribute
/// map always mirrors the held quote: attribution and display name, the
/// validity bounds, and one numeric entry per recognized price component.
/// Components with a charge setter outside the [`ChargeSetter`] set are
/// logged at WARN and left out of the map.
pub struct PricingSensor<A> {
    api: A,
    price: Option<PriceQuote>,
    attributes: BTreeMap<&'static str, AttributeValue>,
}

impl<A: PricingApi + Send> PricingSensor<A> {
    /// Wrap a pricing session in a polled sensor.
    pub fn new(api: A) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(ATTR_ATTRIBUTION, AttributeValue::Text(ATTRIBUTION));
        attributes.insert(ATTR_FRIENDLY_NAME, AttributeValue::Text(FRIENDLY_NAME));

        PricingSensor {
            api,
            price: None,
            attributes,
        }
    }

    /// The quote the sensor currently holds.
    pub fn quote(&self) -> Option<&PriceQuote> {
        self.price.as_ref()
    }

    /// Returns `true` when the held quote's validity window has passed.
    ///
    /// A failed update keeps the previous quote, so [`PolledSensor::value`]
    /// can keep reporting a price whose window is over; this method lets the
    /// host tell that apart from fresh data and from having no data at all
    /// (`value()` returning `None`).
    pub fn is_stale(&self) -> bool {
        match &self.price {
            Some(price) => !price.is_valid_at(Utc::now()),
            None => false,
        }
    }
}

fn attributes_for(quote: &PriceQuote) -> BTreeMap<&'static str, AttributeValue> {
    let mut attributes = BTreeMap::new();
    attributes.insert(ATTR_ATTRIBUTION, AttributeValue::Text(ATTRIBUTION));
    attributes.insert(ATTR_FRIENDLY_NAME, AttributeValue::Text(FRIENDLY_NAME));
    attributes.insert(ATTR_START_AT, AttributeValue::Time(quote.start_at));
    attributes.insert(ATTR_END_AT, AttributeValue::Time(quote.end_at));

    for component in &quote.components {
        match component.charge_setter.parse::<ChargeSetter>() {
            Ok(setter) => {
                attributes.insert(setter.as_str(), AttributeValue::Amount(component.value));
            }
            Err(_) => {
                tracing::warn!(
                    charge_setter = %component.charge_setter,
                    "found unknown price component"
                );
            }
        }
    }

    attributes
}

#[async_trait]
impl<A: PricingApi + Send> PolledSensor for PricingSensor<A> {
    fn name(&self) -> &'static str {
        FRIENDLY_NAME
    }

    fn unit(&self) -> &'static str {
        UNIT_NAME
    }

    fn scan_interval(&self) -> Duration {
        SCAN_INTERVAL
    }

    fn value(&self) -> Option<f64> {
        self.price.as_ref().map(|price| price.price)
    }

    fn attributes(&self) -> &BTreeMap<&'static str, AttributeValue> {
        &self.attributes
    }

    #[tracing::instrument(skip(self))]
    async fn update(&mut self) -> Result<(), Error> {
        if let Some(price) = &self.price {
            if price.is_valid_at(Utc::now()) {
                tracing::trace!("held quote is still valid");
                return Ok(());
            }
        }

        let quote = tokio::time::timeout(FETCH_TIMEOUT, self.api.pricing())
            .await
            .context("price request timed out")??;
        tracing::debug!(price = quote.price, end_at = ?quote.end_at, "fetched a fresh quote");

        // Rebuild wholesale so nothing from a superseded quote lingers.
        self.attributes = attributes_for(&quote);
        self.price = Some(quote);

        Ok(())
    }
}
