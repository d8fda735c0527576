//! Receipt
//!
//! Sends a finished sale to the customer over WhatsApp. The receipt is
//! rendered into an image and handed to the platform share sheet. Where
//! there is none, the image is downloaded and a text version is sent
//! through a ``wa.me`` link instead.
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use log::{debug, error, info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::{
    auth::signup::ValidationError,
    whatsapp::{validate_phone, wa_link},
};

mod render;
mod share;

pub use render::{ReceiptRenderer, RenderedImage, SvgRenderer};
pub use share::{DesktopShare, ShareTarget};

/// Header when the store has no name
pub const DEFAULT_TITLE: &str = "NOTA PEMBELIAN";
/// Footer when the store has no name
pub const DEFAULT_STORE_NAME: &str = "Toko Kami";
pub const THANK_YOU: &str = "Terima kasih atas kunjungan Anda!";

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    InvalidPhone(#[from] ValidationError),
    #[error("the platform cannot share files")]
    Unsupported,
    #[error("cannot render the receipt: {0}")]
    Render(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{command} exited with {status}")]
    Opener {
        command: String,
        status: std::process::ExitStatus,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReceiptItem {
    pub name: String,
    pub quantity: i64,
    pub sell_price: i64,
    /// Price after a per item discount
    #[serde(default)]
    pub final_price: Option<i64>,
}

impl ReceiptItem {
    /// ``final_price`` unless it is missing or zero
    pub fn price(&self) -> i64 {
        match self.final_price {
            Some(price) if price != 0 => price,
            _ => self.sell_price,
        }
    }

    pub fn total(&self) -> i64 {
        self.price() * self.quantity
    }

    /// ``2 x Rp 5.000 = Rp 10.000``
    pub fn line(&self) -> String {
        format!(
            "{} x {} = {}",
            self.quantity,
            format_rupiah(self.price()),
            format_rupiah(self.total())
        )
    }
}

/// The store name to print, ``None`` when missing or blank
pub fn store_label(store_name: Option<&str>) -> Option<&str> {
    store_name.map(str::trim).filter(|name| !name.is_empty())
}

/// A completed sale. Amounts are whole rupiah.
#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    pub id: String,
    pub timestamp: DateTime<FixedOffset>,
    pub items: Vec<ReceiptItem>,
    pub subtotal: i64,
    #[serde(default)]
    pub discount: i64,
    pub total: i64,
}

impl Receipt {
    /// ``19/10/2026``
    pub fn date(&self) -> String {
        self.timestamp.format("%-d/%-m/%Y").to_string()
    }

    /// ``14.05.09``
    pub fn time(&self) -> String {
        self.timestamp.format("%H.%M.%S").to_string()
    }

    /// File name of the rendered image without extension. Anything but
    /// letters, digits, ``-``, ``_`` and ``.`` becomes ``-`` so the name
    /// stays a single path component.
    pub fn file_stem(&self) -> String {
        let id: String = self
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        format!("nota-{}", id)
    }

    /// The plain text version sent through the ``wa.me`` link
    pub fn text_message(&self, store_name: Option<&str>) -> String {
        let store_name = store_label(store_name);
        let mut message = format!("*{}*\n", store_name.unwrap_or(DEFAULT_TITLE));
        message.push_str(SEPARATOR);
        message.push_str("\n\n");
        message.push_str(&format!("No: {}\n", self.id));
        message.push_str(&format!("Tanggal: {}\n", self.date()));
        message.push_str(&format!("Waktu: {}\n\n", self.time()));
        message.push_str(SEPARATOR);
        message.push_str("\n\n");

        for item in &self.items {
            message.push_str(&format!("{}\n{}\n\n", item.name, item.line()));
        }

        message.push_str(SEPARATOR);
        message.push_str("\n\n");
        message.push_str(&format!("Sub Total: {}\n", format_rupiah(self.subtotal)));
        if self.discount > 0 {
            message.push_str(&format!("Diskon: {}\n", format_rupiah(self.discount)));
        }
        message.push_str(&format!("*Total: {}*\n", format_rupiah(self.total)));
        // paid exactly, no change
        message.push_str(&format!("Bayar: {}\n", format_rupiah(self.total)));
        message.push_str("Kembali: Rp 0\n\n");
        message.push_str(SEPARATOR);
        message.push_str("\n\n");
        message.push_str(THANK_YOU);
        message.push('\n');
        message.push_str(store_name.unwrap_or(DEFAULT_STORE_NAME));
        message
    }
}

/// ``15000`` becomes ``Rp 15.000``
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

/// What [`share_receipt`] ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareOutcome {
    /// The image went through the share sheet
    Shared { file_name: String },
    /// The image (if it could be rendered) was downloaded and the text link opened
    Fallback {
        downloaded: Option<PathBuf>,
        link: String,
    },
}

/// Sends ``receipt`` to ``phone``.
///
/// The share sheet is tried first. Rendering, sharing and downloading
/// failures are logged and fall through to the text link, which is always
/// opened when the share sheet was not used.
pub fn share_receipt(
    receipt: &Receipt,
    phone: &str,
    store_name: Option<&str>,
    renderer: &dyn ReceiptRenderer,
    target: &dyn ShareTarget,
) -> Result<ShareOutcome, ShareError> {
    let phone = validate_phone(phone)?;
    let store_name = store_label(store_name);

    let image = match renderer.render(receipt, store_name) {
        Ok(image) => Some(image),
        Err(e) => {
            error!("cannot render receipt {}: {}", receipt.id, e);
            None
        }
    };

    if let Some(image) = &image {
        if target.can_share_files() {
            let title = format!("Nota {}", receipt.id);
            let text = format!("Nota dari {}", store_name.unwrap_or(DEFAULT_STORE_NAME));
            match target.share_file(image, &title, &text) {
                Ok(()) => {
                    info!("receipt {} shared as {}", receipt.id, image.file_name);
                    return Ok(ShareOutcome::Shared {
                        file_name: image.file_name.clone(),
                    });
                }
                Err(e) => warn!("sharing receipt {} failed: {}", receipt.id, e),
            }
        } else {
            debug!("no share sheet, falling back to download");
        }
    }

    let downloaded = image.and_then(|image| match target.download(&image) {
        Ok(path) => {
            info!("receipt {} downloaded to {}", receipt.id, path.display());
            Some(path)
        }
        Err(e) => {
            warn!("downloading receipt {} failed: {}", receipt.id, e);
            None
        }
    });

    let link = wa_link(&phone, Some(&receipt.text_message(store_name)));
    target.open_url(&link)?;
    Ok(ShareOutcome::Fallback { downloaded, link })
}
