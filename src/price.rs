//! Price records returned by the Flick mobile provider API.

use anyhow::{anyhow, Error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A priced snapshot of the current per-kWh power price.
///
/// Prices are quoted in cents and are valid for the interval
/// `[start_at, end_at]`. The total price is itemized into [`PriceComponent`]s
/// set by the various parties on the bill (retailer margin, network charges,
/// levies, and so on).
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "serde_help::PriceRaw")]
pub struct PriceQuote {
    /// The unit price itself, in cents per kWh.
    pub price: f64,
    /// The start of the quote's validity window.
    pub start_at: DateTime<Utc>,
    /// The end of the quote's validity window.
    pub end_at: DateTime<Utc>,
    /// The named sub-charges contributing to `price`, in the order the API
    /// reports them.
    pub components: Vec<PriceComponent>,
}

impl PriceQuote {
    /// Returns `true` if this quote is still valid at the given `time`.
    ///
    /// Note: the API quotes inclusive end times (`end_at` is the last instant
    /// of the half-hour pricing period, e.g. `02:59:59Z`), so a quote whose
    /// `end_at` equals `time` still counts as valid.
    pub fn is_valid_at(&self, time: DateTime<Utc>) -> bool {
        self.end_at >= time
    }
}

/// A named sub-charge contributing to the total unit price.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceComponent {
    /// The party setting this charge, e.g. `"retailer"` or `"network"`.
    ///
    /// Kept as the raw wire string: the API occasionally introduces charge
    /// setters this crate does not know about, and those must still survive
    /// parsing. Use [`ChargeSetter`]'s `FromStr` to check against the known
    /// set.
    pub charge_setter: String,
    /// The charge amount, in cents per kWh.
    pub value: f64,
}

/// The charge setters this crate recognizes on a [`PriceComponent`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(try_from = "&str")]
#[serde(into = "String")]
pub enum ChargeSetter {
    /// The retailer's own margin.
    Retailer,
    /// Electricity Authority levies.
    Ea,
    /// Metering charges.
    Metering,
    /// Generation (wholesale spot) cost.
    Generation,
    /// Administration charges.
    Admin,
    /// Local network line charges.
    Network,
}

impl ChargeSetter {
    /// The wire name of this charge setter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeSetter::Retailer => "retailer",
            ChargeSetter::Ea => "ea",
            ChargeSetter::Metering => "metering",
            ChargeSetter::Generation => "generation",
            ChargeSetter::Admin => "admin",
            ChargeSetter::Network => "network",
        }
    }
}

impl std::fmt::Display for ChargeSetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChargeSetter {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retailer" => Ok(ChargeSetter::Retailer),
            "ea" => Ok(ChargeSetter::Ea),
            "metering" => Ok(ChargeSetter::Metering),
            "generation" => Ok(ChargeSetter::Generation),
            "admin" => Ok(ChargeSetter::Admin),
            "network" => Ok(ChargeSetter::Network),
            _ => Err(anyhow!("Unknown charge setter")),
        }
    }
}

// FromStr/ToString and TryFrom/Into don't come for free from each other,
// and serde wants the latter pair.

impl Into<String> for ChargeSetter {
    fn into(self) -> String {
        self.to_string()
    }
}

impl std::convert::TryFrom<&str> for ChargeSetter {
    type Error = <ChargeSetter as std::str::FromStr>::Err;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

mod serde_help {
    use super::*;

    use serde::{de, Deserializer};

    // The API wraps the current price in a "needle" envelope alongside
    // customer metadata; this crate only keeps the needle.

    #[derive(Deserialize)]
    pub struct PriceRaw {
        pub needle: NeedleRaw,
    }

    #[derive(Deserialize)]
    pub struct NeedleRaw {
        #[serde(deserialize_with = "de_f64_from_str")]
        pub price: f64,
        pub start_at: DateTime<Utc>,
        pub end_at: DateTime<Utc>,
        #[serde(default)]
        pub components: Vec<ComponentRaw>,
    }

    #[derive(Deserialize)]
    pub struct ComponentRaw {
        pub charge_setter: String,
        #[serde(deserialize_with = "de_f64_from_str")]
        pub value: f64,
    }

    // The API encodes money amounts as strings ("11.163"), but nothing in
    // the docs promises it will stay that way, so accept plain numbers too.
    pub fn de_f64_from_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde_json::Value;
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => s.parse().map_err(de::Error::custom)?,
            Value::Number(num) => num.as_f64().ok_or(de::Error::custom("invalid number"))?,
            _ => return Err(de::Error::custom("wrong type")),
        })
    }

    impl From<PriceRaw> for PriceQuote {
        fn from(raw: PriceRaw) -> PriceQuote {
            let needle = raw.needle;
            PriceQuote {
                price: needle.price,
                start_at: needle.start_at,
                end_at: needle.end_at,
                components: needle
                    .components
                    .into_iter()
                    .map(|c| PriceComponent {
                        charge_setter: c.charge_setter,
                        value: c.value,
                    })
                    .collect(),
            }
        }
    }
}
