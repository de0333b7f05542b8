//! Unofficial Rust bindings to the [Flick Electric][flick] pricing API,
//! which provides real-time retail spot power prices for Flick customers in
//! New Zealand.
//!
//! Flick passes the wholesale spot price through to consumers, so the unit
//! price changes every half-hour pricing period. The API reports the current
//! price in cents per kWh together with its validity window and the itemized
//! charges making it up, represented in this crate by the [`PriceQuote`]
//! type. API calls are performed using the [`FlickApi`] type, which
//! represents an authenticated session with the API and automatically
//! refreshes its access token. The [`PricingSensor`] type adapts a pricing
//! session to the polled-sensor contract of home-automation hosts
//! ([`PolledSensor`]), fetching at most once per validity window, and
//! [`config_flow::FlowManager`] implements the single-instance entry wizard
//! used to set such an integration up.
//!
//! This crate currently supports the following subset of the API:
//!
//! - ☐ account sign-up (use the mobile app for now);
//! - ☑ authentication and session management, using the [`FlickApi`] type;
//! - ☑ the current price quote, using [`FlickApi::pricing`];
//! - ☑ a polled price sensor, using [`PricingSensor`];
//! - ☑ config-entry creation, using [`config_flow::FlowManager`];
//! - ☐ usage and billing data;
//! - ☐ rate limiting and backpressure;
//!
//! This is an unofficial set of bindings, with no guarantees about
//! maintenance or functional correctness.
//!
//! [flick]: https://www.flickelectric.co.nz/

pub mod client;
pub mod config_flow;
pub mod price;
pub mod sensor;

pub use client::{Credentials, FlickApi, PricingApi};
pub use price::{ChargeSetter, PriceComponent, PriceQuote};
pub use sensor::{AttributeValue, PolledSensor, PricingSensor};
