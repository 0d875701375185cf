//! # Template Codec
//!
//! Serializes command invocations to the flat `cmd=<name>&<k>=<v>` form and
//! back. The same string is persisted as a user's pending template and
//! carried verbatim as the payload of chat buttons, so encoding is stable
//! byte-for-byte and decoding tolerates unknown or missing keys.
//!
//! Unset slots are written as the literal sentinel `None` so the parameter
//! list keeps its shape; flags are `True`/`False`; the slot awaiting the next
//! free-text reply is the placeholder token `{text}`.

use std::str::FromStr;

use crate::domain::commands::{
    Arg, Invocation, ListTradesArgs, PlaceOrderArgs, UpdateOrderArgs,
};
use crate::domain::errors::CodecError;
use crate::domain::types::{OrderAction, OrderLot};

/// Marker filled by the next free-text reply.
pub const PLACEHOLDER: &str = "{text}";

/// Sentinel for a parameter the user has not supplied.
const UNSET: &str = "None";

/// Substitute a free-text reply into a stored template.
///
/// Works on the raw string, so the reply lands in the template exactly as
/// typed. Stored templates carry exactly one placeholder.
pub fn fill(template: &str, text: &str) -> String {
    template.replace(PLACEHOLDER, text)
}

pub fn encode(invocation: &Invocation) -> String {
    match invocation {
        Invocation::PlaceOrder(args) => format!(
            "cmd=place_order&order_lot={}&stock_id={}&price={}&quantity={}&action={}&confirm={}",
            field(&args.order_lot, |v| v.as_str().to_string()),
            field(&args.stock_id, |v| v.clone()),
            field(&args.price, |v| v.to_string()),
            field(&args.quantity, |v| v.to_string()),
            field(&args.action, |v| v.as_str().to_string()),
            flag(args.confirm),
        ),
        Invocation::UpdateOrder(args) => format!(
            "cmd=update_order&trade_id={}&update_quantity={}&quantity={}&price={}",
            field(&args.trade_id, |v| v.clone()),
            flag(args.update_quantity),
            field(&args.quantity, |v| v.to_string()),
            field(&args.price, |v| v.to_string()),
        ),
        Invocation::ListTrades(args) => {
            format!("cmd=list_trades&filled_only={}", flag(args.filled_only))
        }
        Invocation::Stock => "cmd=stock".to_string(),
        Invocation::Balance => "cmd=balance".to_string(),
        Invocation::Cancel => "cmd=cancel".to_string(),
    }
}

pub fn decode(payload: &str) -> Result<Invocation, CodecError> {
    let raw = parse_raw(payload)?;
    match raw.cmd.as_str() {
        "place_order" => Ok(Invocation::PlaceOrder(PlaceOrderArgs {
            order_lot: enum_arg(&raw, "order_lot", OrderLot::from_str)?,
            stock_id: text_arg(&raw, "stock_id"),
            price: parse_arg(&raw, "price")?,
            quantity: parse_arg(&raw, "quantity")?,
            action: enum_arg(&raw, "action", OrderAction::from_str)?,
            confirm: flag_arg(&raw, "confirm")?,
        })),
        "update_order" => Ok(Invocation::UpdateOrder(UpdateOrderArgs {
            trade_id: text_arg(&raw, "trade_id"),
            update_quantity: flag_arg(&raw, "update_quantity")?,
            quantity: parse_arg(&raw, "quantity")?,
            price: parse_arg(&raw, "price")?,
        })),
        "list_trades" => Ok(Invocation::ListTrades(ListTradesArgs {
            filled_only: flag_arg(&raw, "filled_only")?,
        })),
        "stock" => Ok(Invocation::Stock),
        "balance" => Ok(Invocation::Balance),
        "cancel" => Ok(Invocation::Cancel),
        other => Err(CodecError::UnknownCommand(other.to_string())),
    }
}

/// A parsed payload before typing: the command name and its key-value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInvocation {
    pub cmd: String,
    pub fields: Vec<(String, String)>,
}

/// Split `cmd=<name>&<k>=<v>&...` into its parts. Segments without `=` are
/// skipped; the split is on the first `=` so values may contain more of them.
pub fn parse_raw(payload: &str) -> Result<RawInvocation, CodecError> {
    let mut cmd = None;
    let mut fields = Vec::new();
    for segment in payload.split('&') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        if key == "cmd" {
            cmd = Some(value.to_string());
        } else {
            fields.push((key.to_string(), value.to_string()));
        }
    }
    match cmd {
        Some(cmd) => Ok(RawInvocation { cmd, fields }),
        None => Err(CodecError::MissingCommand),
    }
}

fn field<T>(arg: &Arg<T>, render: impl Fn(&T) -> String) -> String {
    match arg {
        Arg::Unset => UNSET.to_string(),
        Arg::Pending => PLACEHOLDER.to_string(),
        Arg::Value(v) => render(v),
    }
}

fn flag(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}

fn raw_field<'a>(raw: &'a RawInvocation, key: &str) -> Option<&'a str> {
    raw.fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn text_arg(raw: &RawInvocation, key: &str) -> Arg<String> {
    match raw_field(raw, key) {
        None | Some(UNSET) => Arg::Unset,
        Some(PLACEHOLDER) => Arg::Pending,
        Some(v) => Arg::Value(v.to_string()),
    }
}

fn parse_arg<T: FromStr>(raw: &RawInvocation, key: &'static str) -> Result<Arg<T>, CodecError> {
    match raw_field(raw, key) {
        None | Some(UNSET) => Ok(Arg::Unset),
        Some(PLACEHOLDER) => Ok(Arg::Pending),
        Some(v) => v.parse().map(Arg::Value).map_err(|_| CodecError::BadValue {
            param: key,
            value: v.to_string(),
        }),
    }
}

fn enum_arg<T>(
    raw: &RawInvocation,
    key: &'static str,
    from_str: impl Fn(&str) -> Option<T>,
) -> Result<Arg<T>, CodecError> {
    match raw_field(raw, key) {
        None | Some(UNSET) => Ok(Arg::Unset),
        Some(PLACEHOLDER) => Ok(Arg::Pending),
        Some(v) => from_str(v).map(Arg::Value).ok_or(CodecError::BadValue {
            param: key,
            value: v.to_string(),
        }),
    }
}

/// Missing flags read as false, so short historic button payloads keep
/// decoding.
fn flag_arg(raw: &RawInvocation, key: &'static str) -> Result<bool, CodecError> {
    match raw_field(raw, key) {
        None | Some(UNSET) | Some("False") => Ok(false),
        Some("True") => Ok(true),
        Some(v) => Err(CodecError::BadValue {
            param: key,
            value: v.to_string(),
        }),
    }
}
