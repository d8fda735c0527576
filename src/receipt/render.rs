use super::{
    format_rupiah, store_label, Receipt, ShareError, DEFAULT_STORE_NAME, DEFAULT_TITLE,
    THANK_YOU,
};

/// An image ready to be shared or saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedImage {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Lays a receipt out into an image
pub trait ReceiptRenderer {
    fn render(&self, receipt: &Receipt, store_name: Option<&str>)
        -> Result<RenderedImage, ShareError>;
}

const WIDTH: u32 = 400;
const PADDING: u32 = 20;
const FONT: &str = "'Courier New', monospace";

enum Line {
    Title(String),
    Rule,
    Text(String),
    Bold(String),
    Total(String),
    Centered(String),
}

impl Line {
    fn height(&self) -> u32 {
        match self {
            Self::Title(_) => 30,
            Self::Rule => 20,
            Self::Total(_) => 26,
            _ => 20,
        }
    }
}

/// Renders the receipt as an SVG document. Turning it into a bitmap is
/// left to whatever displays it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvgRenderer;

impl SvgRenderer {
    fn lines(receipt: &Receipt, store_name: Option<&str>) -> Vec<Line> {
        let store_name = store_label(store_name);
        let mut lines = vec![
            Line::Title(store_name.unwrap_or(DEFAULT_TITLE).to_string()),
            Line::Rule,
            Line::Text(format!("No: {}", receipt.id)),
            Line::Text(format!("Tanggal: {}", receipt.date())),
            Line::Text(format!("Waktu: {}", receipt.time())),
            Line::Rule,
        ];
        for item in &receipt.items {
            lines.push(Line::Bold(item.name.clone()));
            lines.push(Line::Text(item.line()));
        }
        lines.push(Line::Rule);
        lines.push(Line::Text(format!(
            "Sub Total: {}",
            format_rupiah(receipt.subtotal)
        )));
        if receipt.discount > 0 {
            lines.push(Line::Text(format!(
                "Diskon: {}",
                format_rupiah(receipt.discount)
            )));
        }
        lines.push(Line::Total(format!("Total: {}", format_rupiah(receipt.total))));
        lines.push(Line::Rule);
        lines.push(Line::Centered(THANK_YOU.to_string()));
        lines.push(Line::Centered(
            store_name.unwrap_or(DEFAULT_STORE_NAME).to_string(),
        ));
        lines
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl ReceiptRenderer for SvgRenderer {
    fn render(
        &self,
        receipt: &Receipt,
        store_name: Option<&str>,
    ) -> Result<RenderedImage, ShareError> {
        let lines = Self::lines(receipt, store_name);
        let height = PADDING * 2 + lines.iter().map(Line::height).sum::<u32>();
        let center = WIDTH / 2;

        let mut body = String::new();
        let mut y = PADDING;
        for line in &lines {
            y += line.height();
            let element = match line {
                Line::Title(text) => format!(
                    r#"<text x="{}" y="{}" font-size="20" font-weight="bold" text-anchor="middle">{}</text>"#,
                    center,
                    y,
                    escape(text)
                ),
                Line::Rule => format!(
                    r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="black" stroke-width="2"/>"#,
                    PADDING,
                    y - 10,
                    WIDTH - PADDING,
                    y - 10
                ),
                Line::Text(text) => format!(
                    r#"<text x="{}" y="{}" font-size="14">{}</text>"#,
                    PADDING,
                    y,
                    escape(text)
                ),
                Line::Bold(text) => format!(
                    r#"<text x="{}" y="{}" font-size="14" font-weight="bold">{}</text>"#,
                    PADDING,
                    y,
                    escape(text)
                ),
                Line::Total(text) => format!(
                    r#"<text x="{}" y="{}" font-size="18" font-weight="bold">{}</text>"#,
                    PADDING,
                    y,
                    escape(text)
                ),
                Line::Centered(text) => format!(
                    r#"<text x="{}" y="{}" font-size="14" text-anchor="middle">{}</text>"#,
                    center,
                    y,
                    escape(text)
                ),
            };
            body.push_str("  ");
            body.push_str(&element);
            body.push('\n');
        }

        let svg = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                "\n",
                r##"  <rect width="100%" height="100%" fill="#ffffff"/>"##,
                "\n",
                r#"  <g font-family="{font}" fill="black">"#,
                "\n{body}  </g>\n</svg>\n"
            ),
            w = WIDTH,
            h = height,
            font = FONT,
            body = body,
        );

        Ok(RenderedImage {
            file_name: format!("{}.svg", receipt.file_stem()),
            mime_type: "image/svg+xml",
            bytes: svg.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::ReceiptItem;
    use chrono::DateTime;

    #[test]
    fn test_svg_contains_escaped_lines() {
        let receipt = Receipt {
            id: "TRX-1".to_string(),
            timestamp: DateTime::parse_from_rfc3339("2026-10-19T14:05:09+07:00").unwrap(),
            items: vec![ReceiptItem {
                name: "Roti <coklat> & keju".to_string(),
                quantity: 1,
                sell_price: 12000,
                final_price: None,
            }],
            subtotal: 12000,
            discount: 0,
            total: 12000,
        };
        let image = SvgRenderer.render(&receipt, None).unwrap();
        assert_eq!(image.file_name, "nota-TRX-1.svg");
        let svg = String::from_utf8(image.bytes).unwrap();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("NOTA PEMBELIAN"));
        assert!(svg.contains("Roti &lt;coklat&gt; &amp; keju"));
        assert!(svg.contains("Tanggal: 19/10/2026"));
        assert!(!svg.contains("Diskon"));
        assert!(svg.contains("Toko Kami"));

        let blank = SvgRenderer.render(&receipt, Some("  ")).unwrap();
        let svg = String::from_utf8(blank.bytes).unwrap();
        assert!(svg.contains("NOTA PEMBELIAN"));

        let named = SvgRenderer.render(&receipt, Some("Warung Maju")).unwrap();
        let svg = String::from_utf8(named.bytes).unwrap();
        assert!(!svg.contains("NOTA PEMBELIAN"));
        assert!(svg.contains("Warung Maju"));
    }
}
