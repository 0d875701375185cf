//! # LINE Messaging Client
//!
//! Thin client for the LINE Messaging API: reply messages (text, confirm,
//! buttons, carousel) and rich menu installation. `LineService` binds the
//! shared client to one event's reply token and implements `ChatProvider`
//! for the command handlers.

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::application::codec;
use crate::domain::commands::{Invocation, ListTradesArgs, PlaceOrderArgs};
use crate::domain::traits::{CarouselColumn, ChatProvider, PostbackChoice};
use crate::strings::messages;

const API_BASE: &str = "https://api.line.me/v2/bot";
const DATA_API_BASE: &str = "https://api-data.line.me/v2/bot";

/// LINE renders at most ten carousel columns per message.
pub const MAX_CAROUSEL_COLUMNS: usize = 10;

/// HTTP client reused across requests
fn http_client() -> &'static Client {
    use std::sync::OnceLock;
    static CLIENT: OnceLock<Client> = OnceLock::new();
    CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client")
    })
}

#[derive(Debug, Serialize)]
struct ReplyRequest {
    #[serde(rename = "replyToken")]
    reply_token: String,
    messages: Vec<ReplyMessage>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReplyMessage {
    Text {
        text: String,
    },
    Template {
        #[serde(rename = "altText")]
        alt_text: String,
        template: ReplyTemplate,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReplyTemplate {
    Confirm {
        text: String,
        actions: Vec<ReplyAction>,
    },
    Buttons {
        text: String,
        actions: Vec<ReplyAction>,
    },
    Carousel {
        columns: Vec<ReplyColumn>,
    },
}

#[derive(Debug, Serialize)]
struct ReplyColumn {
    text: String,
    actions: Vec<ReplyAction>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ReplyAction {
    Postback { label: String, data: String },
}

#[derive(Debug, Serialize)]
struct RichMenuRequest {
    size: RichMenuSize,
    selected: bool,
    name: String,
    #[serde(rename = "chatBarText")]
    chat_bar_text: String,
    areas: Vec<RichMenuArea>,
}

#[derive(Debug, Serialize)]
struct RichMenuSize {
    width: u32,
    height: u32,
}

#[derive(Debug, Serialize)]
struct RichMenuArea {
    bounds: RichMenuBounds,
    action: ReplyAction,
}

#[derive(Debug, Serialize)]
struct RichMenuBounds {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct RichMenuIdResponse {
    #[serde(rename = "richMenuId")]
    rich_menu_id: String,
}

#[derive(Debug, Deserialize)]
struct RichMenuListResponse {
    richmenus: Vec<RichMenuIdResponse>,
}

pub struct LineClient {
    access_token: String,
}

impl LineClient {
    pub fn new(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        anyhow::bail!("LINE API returned HTTP {}: {}", status, error_text)
    }

    async fn reply(&self, reply_token: &str, message: ReplyMessage) -> Result<()> {
        let request = ReplyRequest {
            reply_token: reply_token.to_string(),
            messages: vec![message],
        };
        let response = http_client()
            .post(format!("{}/message/reply", API_BASE))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&request)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Replace any existing rich menus with the navigation menu, upload its
    /// image and set it as every user's default.
    pub async fn setup_rich_menu(&self, image_path: &Path) -> Result<()> {
        self.delete_all_rich_menus().await?;
        let rich_menu_id = self.create_rich_menu().await?;
        self.upload_rich_menu_image(&rich_menu_id, image_path)
            .await?;
        self.set_default_rich_menu(&rich_menu_id).await?;
        tracing::info!("Installed rich menu '{}'", rich_menu_id);
        Ok(())
    }

    async fn delete_all_rich_menus(&self) -> Result<()> {
        let response = http_client()
            .get(format!("{}/richmenu/list", API_BASE))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;
        let list: RichMenuListResponse = Self::check(response).await?.json().await?;
        for menu in list.richmenus {
            let response = http_client()
                .delete(format!("{}/richmenu/{}", API_BASE, menu.rich_menu_id))
                .header("Authorization", format!("Bearer {}", self.access_token))
                .send()
                .await?;
            Self::check(response).await?;
        }
        Ok(())
    }

    async fn create_rich_menu(&self) -> Result<String> {
        let response = http_client()
            .post(format!("{}/richmenu", API_BASE))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&default_rich_menu())
            .send()
            .await?;
        let created: RichMenuIdResponse = Self::check(response).await?.json().await?;
        Ok(created.rich_menu_id)
    }

    async fn upload_rich_menu_image(&self, rich_menu_id: &str, image_path: &Path) -> Result<()> {
        let image = std::fs::read(image_path)?;
        let response = http_client()
            .post(format!("{}/richmenu/{}/content", DATA_API_BASE, rich_menu_id))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", "image/png")
            .body(image)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_default_rich_menu(&self, rich_menu_id: &str) -> Result<()> {
        let response = http_client()
            .post(format!("{}/user/all/richmenu/{}", API_BASE, rich_menu_id))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// The six-cell navigation menu, two rows of three. Every cell's payload is
/// an encoded invocation, so a tap enters the dispatcher like any other
/// postback.
fn default_rich_menu() -> RichMenuRequest {
    let cells: [(&str, String); 6] = [
        (
            messages::POSITIONS_TITLE,
            codec::encode(&Invocation::Stock),
        ),
        (messages::MENU_BALANCE, codec::encode(&Invocation::Balance)),
        (
            messages::MENU_PLACE_ORDER,
            codec::encode(&Invocation::PlaceOrder(PlaceOrderArgs::default())),
        ),
        (
            messages::TRADES_TITLE,
            codec::encode(&Invocation::ListTrades(ListTradesArgs {
                filled_only: false,
            })),
        ),
        (
            messages::MENU_FILLED_TRADES,
            codec::encode(&Invocation::ListTrades(ListTradesArgs {
                filled_only: true,
            })),
        ),
        (messages::CANCEL_LABEL, codec::encode(&Invocation::Cancel)),
    ];
    let areas = cells
        .into_iter()
        .enumerate()
        .map(|(index, (label, data))| RichMenuArea {
            bounds: RichMenuBounds {
                x: [23, 418, 813][index % 3],
                y: if index < 3 { 18 } else { 423 },
                width: 364,
                height: 364,
            },
            action: ReplyAction::Postback {
                label: label.to_string(),
                data,
            },
        })
        .collect();
    RichMenuRequest {
        size: RichMenuSize {
            width: 1200,
            height: 810,
        },
        selected: true,
        name: "rich_menu_1".to_string(),
        chat_bar_text: messages::MENU_BAR_TEXT.to_string(),
        areas,
    }
}

/// One event's reply channel: the shared client plus that event's single-use
/// reply token.
pub struct LineService {
    client: Arc<LineClient>,
    reply_token: String,
}

impl LineService {
    pub fn new(client: Arc<LineClient>, reply_token: &str) -> Self {
        Self {
            client,
            reply_token: reply_token.to_string(),
        }
    }
}

fn to_action(choice: PostbackChoice) -> ReplyAction {
    ReplyAction::Postback {
        label: choice.label,
        data: choice.data,
    }
}

#[async_trait]
impl ChatProvider for LineService {
    async fn reply_text(&self, text: &str) -> Result<(), String> {
        self.client
            .reply(
                &self.reply_token,
                ReplyMessage::Text {
                    text: text.to_string(),
                },
            )
            .await
            .map_err(|e| e.to_string())
    }

    async fn reply_confirm(
        &self,
        alt_text: &str,
        text: &str,
        actions: [PostbackChoice; 2],
    ) -> Result<(), String> {
        let message = ReplyMessage::Template {
            alt_text: alt_text.to_string(),
            template: ReplyTemplate::Confirm {
                text: text.to_string(),
                actions: actions.into_iter().map(to_action).collect(),
            },
        };
        self.client
            .reply(&self.reply_token, message)
            .await
            .map_err(|e| e.to_string())
    }

    async fn reply_buttons(
        &self,
        alt_text: &str,
        text: &str,
        actions: Vec<PostbackChoice>,
    ) -> Result<(), String> {
        let message = ReplyMessage::Template {
            alt_text: alt_text.to_string(),
            template: ReplyTemplate::Buttons {
                text: text.to_string(),
                actions: actions.into_iter().map(to_action).collect(),
            },
        };
        self.client
            .reply(&self.reply_token, message)
            .await
            .map_err(|e| e.to_string())
    }

    async fn reply_carousel(
        &self,
        alt_text: &str,
        mut columns: Vec<CarouselColumn>,
    ) -> Result<(), String> {
        if columns.len() > MAX_CAROUSEL_COLUMNS {
            tracing::warn!(
                "Trimming carousel from {} to {} columns",
                columns.len(),
                MAX_CAROUSEL_COLUMNS
            );
            columns.truncate(MAX_CAROUSEL_COLUMNS);
        }
        let message = ReplyMessage::Template {
            alt_text: alt_text.to_string(),
            template: ReplyTemplate::Carousel {
                columns: columns
                    .into_iter()
                    .map(|column| ReplyColumn {
                        text: column.text,
                        actions: column.actions.into_iter().map(to_action).collect(),
                    })
                    .collect(),
            },
        };
        self.client
            .reply(&self.reply_token, message)
            .await
            .map_err(|e| e.to_string())
    }
}
