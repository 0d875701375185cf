//! # Messages
//!
//! Contains constant strings and format functions for user-facing messages.
//! All replies are Traditional Chinese, matching the brokerage's market.

pub const NOT_CONFIGURED: &str = "請先設定永豐金證卷帳戶";

pub const ASK_ORDER_LOT: &str = "請選擇下單的委託類型";
pub const ASK_STOCK_ID: &str = "請輸入要下單的股票代號";
pub const ASK_ACTION: &str = "請選擇要下單的交易行為";
pub const ASK_TRADE_ID: &str = "請輸入要修改的委託單編號";

pub const CONFIRM_ORDER: &str = "確認下單?";
pub const CONFIRM_LABEL: &str = "確定";
pub const CANCEL_LABEL: &str = "取消";
pub const CANCELLED: &str = "已取消";

pub const POSITIONS_TITLE: &str = "庫存";
pub const TRADES_TITLE: &str = "委託單";
pub const NO_POSITIONS: &str = "目前沒有庫存";
pub const NO_TRADES: &str = "目前沒有委託單";
pub const NO_FILLED_TRADES: &str = "目前沒有成交單";

pub const BUY_MORE_LABEL: &str = "加買";
pub const REDUCE_LABEL: &str = "減量";
pub const DELETE_LABEL: &str = "刪單";
pub const REPRICE_LABEL: &str = "改價";

pub const MENU_BALANCE: &str = "帳戶餘額";
pub const MENU_PLACE_ORDER: &str = "下單";
pub const MENU_FILLED_TRADES: &str = "成交單";
pub const MENU_BAR_TEXT: &str = "打開/關閉導覽列";

pub const UNSUPPORTED_ORDER: &str = "不支援的委託單類型";
pub const PRICE_CHANGE_NOT_ALLOWED: &str = "零股委託無法改價";
pub const UNEXPECTED_ERROR: &str = "❌ 發生未預期的錯誤，請稍後再試";

pub fn ask_price(reference: f64, limit_up: f64, limit_down: f64) -> String {
    format!(
        "請輸入要下單的價格\n\n參考價: NTD${reference}\n漲停: NTD${limit_up}\n跌停: NTD${limit_down}"
    )
}

pub fn ask_quantity(unit: &str, balance: i64, max_affordable: u64) -> String {
    format!("請輸入要下單的{unit}數\n\n帳戶餘額: NTD${balance}\n最多可買: {max_affordable} {unit}")
}

pub fn ask_new_quantity(current: u32, unit: &str) -> String {
    format!("請輸入新的數量\n\n目前數量: {current} {unit}")
}

pub fn ask_new_price(current: f64) -> String {
    format!("請輸入新的價格\n\n目前價格: NTD${current}")
}

pub fn confirm_order(stock_id: &str, quantity: u32, unit: &str, price: f64, action: &str, lot: &str) -> String {
    format!(
        "確認下單?\n\n股票代號: {stock_id}\n{unit}數: {quantity}\n價格: NTD${price}\n交易行為: {action}\n委託類型: {lot}"
    )
}

#[allow(clippy::too_many_arguments)]
pub fn order_placed(
    stock_id: &str,
    quantity: u32,
    unit: &str,
    price: f64,
    action: &str,
    lot: &str,
    order_id: &str,
    status: &str,
) -> String {
    format!(
        "✅ 下單成功\n\n股票代號: {stock_id}\n{unit}數: {quantity}\n價格: NTD${price}\n交易行為: {action}\n委託類型: {lot}\n委託單編號: {order_id}\n委託單狀態: {status}"
    )
}

pub fn stock_not_found(stock_id: &str) -> String {
    format!("找不到代號為 {stock_id} 的股票")
}

pub fn trade_not_found(trade_id: &str) -> String {
    format!("找不到編號為 {trade_id} 的委託單")
}

pub fn quantity_not_decreasing(current: u32) -> String {
    format!("新數量必須小於目前數量 {current}")
}

pub fn order_cancelled(order_id: &str) -> String {
    format!("✅ 已刪除委託單 {order_id}")
}

pub fn order_quantity_updated(order_id: &str, quantity: u32, unit: &str) -> String {
    format!("✅ 已將委託單 {order_id} 的數量改為 {quantity} {unit}")
}

pub fn order_price_updated(order_id: &str, price: f64) -> String {
    format!("✅ 已將委託單 {order_id} 的價格改為 NTD${price}")
}

pub fn balance(amount: i64) -> String {
    format!("帳戶餘額: NTD${amount}")
}

pub fn invalid_input(value: &str) -> String {
    format!("無效的輸入: {value}")
}

pub fn position_column(
    code: &str,
    name: &str,
    quantity: u32,
    price: f64,
    last_price: f64,
    pnl: f64,
) -> String {
    format!(
        "[{code}] {name}\n\n張數: {quantity}\n平均價格: NTD${price}\n目前股價: NTD${last_price}\n損益: NTD${pnl}"
    )
}

#[allow(clippy::too_many_arguments)]
pub fn trade_column(
    order_id: &str,
    code: &str,
    name: &str,
    status: &str,
    quantity: u32,
    price: f64,
    action: &str,
    lot: &str,
    time: &str,
) -> String {
    format!(
        "委託單 {order_id}\n\n股票: [{code}] {name}\n狀態: {status}\n數量: {quantity}\n價格: NTD${price}\n交易行為: {action}\n委託類型: {lot}\n時間: {time}"
    )
}
