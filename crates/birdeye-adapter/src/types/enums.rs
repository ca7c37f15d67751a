/*
[INPUT]:  API schema definitions and serde requirements
[OUTPUT]: Typed Rust enums shared by the REST and WebSocket layers
[POS]:    Data layer - type definitions for API communication
[UPDATE]: When Birdeye adds networks or chart intervals
*/

use std::fmt;

use serde::{Deserialize, Serialize};

/// Networks served by Birdeye. The lowercase name doubles as the `x-chain`
/// header value and the streaming URL path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Solana,
    Ethereum,
    Arbitrum,
    Avalanche,
    Bsc,
    Optimism,
    Polygon,
    Base,
    Zksync,
    Sui,
}

impl Chain {
    pub fn as_str(self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
            Chain::Arbitrum => "arbitrum",
            Chain::Avalanche => "avalanche",
            Chain::Bsc => "bsc",
            Chain::Optimism => "optimism",
            Chain::Polygon => "polygon",
            Chain::Base => "base",
            Chain::Zksync => "zksync",
            Chain::Sui => "sui",
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OHLCV chart interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartType {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "3m")]
    ThreeMinutes,
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "2H")]
    TwoHours,
    #[serde(rename = "4H")]
    FourHours,
    #[serde(rename = "6H")]
    SixHours,
    #[serde(rename = "8H")]
    EightHours,
    #[serde(rename = "12H")]
    TwelveHours,
    #[serde(rename = "1D")]
    OneDay,
    #[serde(rename = "3D")]
    ThreeDays,
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
}

impl ChartType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::OneMinute => "1m",
            ChartType::ThreeMinutes => "3m",
            ChartType::FiveMinutes => "5m",
            ChartType::FifteenMinutes => "15m",
            ChartType::ThirtyMinutes => "30m",
            ChartType::OneHour => "1H",
            ChartType::TwoHours => "2H",
            ChartType::FourHours => "4H",
            ChartType::SixHours => "6H",
            ChartType::EightHours => "8H",
            ChartType::TwelveHours => "12H",
            ChartType::OneDay => "1D",
            ChartType::ThreeDays => "3D",
            ChartType::OneWeek => "1W",
            ChartType::OneMonth => "1M",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
