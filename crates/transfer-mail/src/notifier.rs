//! Submission receipts and account verification emails.
//!
//! Delivery is best effort: render and transport failures are logged and
//! reported as `false`, never as errors, so a mail outage cannot fail a
//! submission that has already been committed.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use transfer_core::{InventoryItem, Result, User};

use crate::mailer::{EmailMessage, Mailer};
use crate::template::{
    escape_html, render, TemplateVars, DIGITAL_SECTION_TEMPLATE, PHYSICAL_SECTION_TEMPLATE,
    RECEIPT_TEMPLATE, VERIFY_TEMPLATE,
};

pub const RECEIPT_SUBJECT: &str = "UVA Archives Transfer Receipt";
pub const VERIFY_SUBJECT: &str = "UVA Archives Transfer Verification";

/// Denormalized view of a committed submission for the receipt email.
#[derive(Debug, Clone)]
pub struct ReceiptView {
    pub accession_id: i32,
    pub identifier: String,
    pub submitted_at: DateTime<Utc>,
    pub summary: String,
    pub activities: String,
    pub creator: String,
    /// Comma-joined genre names.
    pub genres: String,
    pub digital: Option<DigitalReceipt>,
    pub physical: Option<PhysicalReceipt>,
}

#[derive(Debug, Clone)]
pub struct DigitalReceipt {
    pub description: String,
    pub date_range: String,
    pub record_types: String,
    pub files: Vec<String>,
    pub total_size_bytes: i64,
}

#[derive(Debug, Clone)]
pub struct PhysicalReceipt {
    pub date_range: String,
    pub box_info: String,
    pub record_types: String,
    pub transfer_method: String,
    pub has_digital: bool,
    pub media_carriers: String,
    pub media_count: String,
    pub has_software: bool,
    pub tech_description: String,
    pub inventory: Vec<InventoryItem>,
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

/// Human-readable byte count.
pub fn format_size(bytes: i64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes.max(0) as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes.max(0))
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}

fn render_digital(digital: &DigitalReceipt) -> Result<String> {
    let files: String = digital
        .files
        .iter()
        .map(|f| format!("<li>{}</li>", escape_html(f)))
        .collect();
    let vars = TemplateVars::new()
        .text("description", &digital.description)
        .text("date_range", &digital.date_range)
        .text("record_types", &digital.record_types)
        .text("total_size", format_size(digital.total_size_bytes))
        .text("file_count", digital.files.len().to_string())
        .html("files", files);
    render(DIGITAL_SECTION_TEMPLATE, &vars)
}

fn render_physical(physical: &PhysicalReceipt) -> Result<String> {
    let inventory: String = physical
        .inventory
        .iter()
        .map(|item| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                escape_html(&item.box_number),
                escape_html(&item.record_group),
                escape_html(&item.title),
                escape_html(&item.description),
                escape_html(&item.dates)
            )
        })
        .collect();
    let vars = TemplateVars::new()
        .text("date_range", &physical.date_range)
        .text("box_info", &physical.box_info)
        .text("record_types", &physical.record_types)
        .text("transfer_method", &physical.transfer_method)
        .text("has_digital", yes_no(physical.has_digital))
        .text("media_carriers", &physical.media_carriers)
        .text("media_count", &physical.media_count)
        .text("has_software", yes_no(physical.has_software))
        .text("tech_description", &physical.tech_description)
        .html("inventory", inventory);
    render(PHYSICAL_SECTION_TEMPLATE, &vars)
}

/// Render the receipt message for a submitter.
pub fn render_receipt(user: &User, receipt: &ReceiptView, bcc: &[String]) -> Result<EmailMessage> {
    let digital = match &receipt.digital {
        Some(d) => render_digital(d)?,
        None => String::new(),
    };
    let physical = match &receipt.physical {
        Some(p) => render_physical(p)?,
        None => String::new(),
    };

    let vars = TemplateVars::new()
        .text("submitter", user.full_name())
        .text("email", &user.email)
        .text("identifier", &receipt.identifier)
        .text(
            "submitted_at",
            receipt.submitted_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        )
        .text("summary", &receipt.summary)
        .text("activities", &receipt.activities)
        .text("creator", &receipt.creator)
        .text("genres", &receipt.genres)
        .html("digital_section", digital)
        .html("physical_section", physical);

    Ok(EmailMessage {
        to: vec![user.email.clone()],
        bcc: bcc.to_vec(),
        subject: RECEIPT_SUBJECT.to_string(),
        html_body: render(RECEIPT_TEMPLATE, &vars)?,
    })
}

/// Render the verification message for a new account.
pub fn render_verification(user: &User, hostname: &str) -> Result<EmailMessage> {
    let vars = TemplateVars::new()
        .text("name", user.full_name())
        .text("url", verification_url(hostname, &user.verify_token));
    Ok(EmailMessage {
        to: vec![user.email.clone()],
        bcc: Vec::new(),
        subject: VERIFY_SUBJECT.to_string(),
        html_body: render(VERIFY_TEMPLATE, &vars)?,
    })
}

/// Link a new user follows to verify their address.
pub fn verification_url(hostname: &str, token: &str) -> String {
    format!("https://{}/verify/{}", hostname, token)
}

/// Renders notifications and hands them to a [`Mailer`].
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    hostname: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, hostname: impl Into<String>) -> Self {
        Self {
            mailer,
            hostname: hostname.into(),
        }
    }

    pub fn transport_name(&self) -> &'static str {
        self.mailer.name()
    }

    /// Send the submission receipt, BCC to `bcc`. Returns whether it was sent.
    pub async fn send_receipt(&self, user: &User, receipt: &ReceiptView, bcc: &[String]) -> bool {
        let message = match render_receipt(user, receipt, bcc) {
            Ok(message) => message,
            Err(e) => {
                warn!(subsystem = "mail", op = "send_receipt", accession_id = receipt.accession_id, error = %e, "Unable to render receipt email");
                return false;
            }
        };
        self.deliver("send_receipt", &message).await
    }

    /// Send the verification link to a new user. Returns whether it was sent.
    pub async fn send_verification(&self, user: &User) -> bool {
        let message = match render_verification(user, &self.hostname) {
            Ok(message) => message,
            Err(e) => {
                warn!(subsystem = "mail", op = "send_verification", user_id = user.id, error = %e, "Unable to render verification email");
                return false;
            }
        };
        self.deliver("send_verification", &message).await
    }

    async fn deliver(&self, op: &'static str, message: &EmailMessage) -> bool {
        match self.mailer.send(message).await {
            Ok(()) => {
                info!(
                    subsystem = "mail",
                    op,
                    transport = self.mailer.name(),
                    to = %message.to.join(","),
                    bcc_count = message.bcc.len(),
                    "Email sent"
                );
                true
            }
            Err(e) => {
                warn!(
                    subsystem = "mail",
                    op,
                    transport = self.mailer.name(),
                    to = %message.to.join(","),
                    error = %e,
                    "Unable to send email"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Byron".into(),
            title: "Archivist".into(),
            affiliation: "Library".into(),
            email: "ada@example.edu".into(),
            phone: "4345550100".into(),
            verified: false,
            verify_token: "tok123".into(),
            admin: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn receipt() -> ReceiptView {
        ReceiptView {
            accession_id: 9,
            identifier: "abc".into(),
            submitted_at: Utc::now(),
            summary: "Minutes & <agendas>".into(),
            activities: String::new(),
            creator: "Faculty Senate".into(),
            genres: "Administrative records".into(),
            digital: Some(DigitalReceipt {
                description: "Scans".into(),
                date_range: "1990".into(),
                record_types: "Email".into(),
                files: vec!["a.pdf".into(), "<b>.pdf".into()],
                total_size_bytes: 2048,
            }),
            physical: None,
        }
    }

    #[test]
    fn test_receipt_escapes_user_text() {
        let msg = render_receipt(&user(), &receipt(), &["boss@example.edu".into()]).unwrap();
        assert_eq!(msg.subject, RECEIPT_SUBJECT);
        assert_eq!(msg.to, vec!["ada@example.edu"]);
        assert_eq!(msg.bcc, vec!["boss@example.edu"]);
        assert!(msg.html_body.contains("Minutes &amp; &lt;agendas&gt;"));
        assert!(msg.html_body.contains("<li>&lt;b&gt;.pdf</li>"));
        assert!(msg.html_body.contains("Files (2)"));
        assert!(msg.html_body.contains("2.0 KB"));
        assert!(!msg.html_body.contains("Physical transfer"));
    }

    #[test]
    fn test_receipt_with_physical_inventory() {
        let mut view = receipt();
        view.digital = None;
        view.physical = Some(PhysicalReceipt {
            date_range: "1950-1990".into(),
            box_info: "2 cartons".into(),
            record_types: "Reports".into(),
            transfer_method: "Campus mail".into(),
            has_digital: false,
            media_carriers: String::new(),
            media_count: String::new(),
            has_software: false,
            tech_description: String::new(),
            inventory: vec![InventoryItem {
                box_number: "1".into(),
                record_group: "RG-1".into(),
                title: "Box one".into(),
                description: String::new(),
                dates: "1950".into(),
            }],
        });
        let msg = render_receipt(&user(), &view, &[]).unwrap();
        assert!(msg.html_body.contains("Campus mail"));
        assert!(msg.html_body.contains("<td>Box one</td>"));
        assert!(!msg.html_body.contains("Digital transfer"));
    }

    #[test]
    fn test_verification_link() {
        let msg = render_verification(&user(), "transfer.example.edu").unwrap();
        assert_eq!(msg.subject, VERIFY_SUBJECT);
        assert!(msg
            .html_body
            .contains("https://transfer.example.edu/verify/tok123"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(-3), "0 B");
    }
}
