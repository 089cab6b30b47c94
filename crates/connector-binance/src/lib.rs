//! Binance WebSocket connectors: diff depth streams and the user data stream.

mod parser;
mod stream;
mod user_data;

pub use parser::{parse_message, BinanceDepthRaw, ParsedMessage};
pub use stream::{BinanceDiffStream, DiffStreamConfig};
pub use user_data::{
    open_user_data_stream, parse_user_data_message, UserDataConfig, UserDataItem,
    UserDataMessage, UserDataSubscription,
};
