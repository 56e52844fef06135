//! Plain-text renderers for each transactional email

use chrono::NaiveDate;

use camp_core::config::EmailConfig;
use camp_core::{BasisPoints, Cents, DateRange, ReportingPeriod};

use crate::email::{EmailAddress, EmailMessage};

/// One camper line of a checkout
#[derive(Debug, Clone)]
pub struct ConfirmationLine {
    pub athlete_name: String,
    pub camp_name: String,
    pub dates: DateRange,
    pub waitlisted: bool,
    pub total_cents: Cents,
}

#[derive(Debug, Clone)]
pub struct CheckoutConfirmation {
    pub parent_name: String,
    pub lines: Vec<ConfirmationLine>,
    pub discount_cents: Cents,
    pub charged_cents: Cents,
    pub payment_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub struct WaitlistPromotion {
    pub parent_name: String,
    pub athlete_name: String,
    pub camp_name: String,
    pub start_date: NaiveDate,
    pub amount_due_cents: Cents,
}

#[derive(Debug, Clone)]
pub struct ContractSent {
    pub tenant_name: String,
    pub contact_name: Option<String>,
    pub venue_name: String,
    pub title: String,
    pub term: DateRange,
    pub fee_cents: Cents,
    pub deposit_cents: Cents,
}

#[derive(Debug, Clone)]
pub struct InvoiceIssued {
    pub tenant_name: String,
    pub period: ReportingPeriod,
    pub net_revenue_cents: Cents,
    pub rate: BasisPoints,
    pub royalty_due_cents: Cents,
}

/// Builds messages with the configured sender address
#[derive(Debug, Clone)]
pub struct Mailer {
    from: EmailAddress,
}

impl Mailer {
    pub fn new(from: EmailAddress) -> Self {
        Self { from }
    }

    pub fn from_config(config: &EmailConfig) -> Self {
        Self::new(EmailAddress::new(&config.from_address).with_name(&config.from_name))
    }

    pub fn checkout_confirmation(&self, to: EmailAddress, data: &CheckoutConfirmation) -> EmailMessage {
        let mut body = format!("Hi {},\n\nThanks for registering. Here is your summary:\n\n", data.parent_name);
        for line in &data.lines {
            if line.waitlisted {
                body.push_str(&format!(
                    "  {} - {} ({}): WAITLISTED, not charged\n",
                    line.athlete_name,
                    line.camp_name,
                    format_range(&line.dates)
                ));
            } else {
                body.push_str(&format!(
                    "  {} - {} ({}): {}\n",
                    line.athlete_name,
                    line.camp_name,
                    format_range(&line.dates),
                    line.total_cents
                ));
            }
        }
        if data.discount_cents.is_positive() {
            body.push_str(&format!("\nDiscount: -{}\n", data.discount_cents));
        }
        body.push_str(&format!("Total charged: {}\n", data.charged_cents));
        if let Some(reference) = &data.payment_ref {
            body.push_str(&format!("Payment reference: {}\n", reference));
        }
        if data.lines.iter().any(|l| l.waitlisted) {
            body.push_str("\nWe will email you if a waitlisted spot opens up.\n");
        }

        EmailMessage::new(self.from.clone(), to, "Your camp registration", body).tag("checkout")
    }

    pub fn waitlist_promotion(&self, to: EmailAddress, data: &WaitlistPromotion) -> EmailMessage {
        let body = format!(
            "Hi {},\n\nA spot opened up! {} has moved off the waitlist for {} starting {}.\n\n\
             The registration is held for you as pending. Please complete payment of {} to confirm it.\n",
            data.parent_name,
            data.athlete_name,
            data.camp_name,
            data.start_date.format("%B %-d, %Y"),
            data.amount_due_cents
        );
        EmailMessage::new(
            self.from.clone(),
            to,
            format!("A spot opened up at {}", data.camp_name),
            body,
        )
        .tag("waitlist")
    }

    pub fn contract_sent(&self, to: EmailAddress, data: &ContractSent) -> EmailMessage {
        let greeting = data.contact_name.as_deref().unwrap_or(&data.venue_name);
        let body = format!(
            "Hello {},\n\n{} has sent you a rental agreement for review.\n\n\
             Agreement: {}\nTerm: {}\nFee: {}\nDeposit: {}\n\n\
             Reply to this email with any questions.\n",
            greeting,
            data.tenant_name,
            data.title,
            format_range(&data.term),
            data.fee_cents,
            data.deposit_cents
        );
        EmailMessage::new(self.from.clone(), to, format!("Rental agreement: {}", data.title), body)
            .tag("contract")
    }

    pub fn royalty_invoice_issued(&self, to: EmailAddress, data: &InvoiceIssued) -> EmailMessage {
        let body = format!(
            "Hello {},\n\nYour royalty invoice for {} to {} (exclusive) has been issued.\n\n\
             Net revenue: {}\nRoyalty rate: {}\nAmount due: {}\n",
            data.tenant_name,
            data.period.from,
            data.period.to,
            data.net_revenue_cents,
            data.rate,
            data.royalty_due_cents
        );
        EmailMessage::new(
            self.from.clone(),
            to,
            format!("Royalty invoice for {}", data.period.from.format("%B %Y")),
            body,
        )
        .tag("royalty")
    }
}

fn format_range(range: &DateRange) -> String {
    if range.start == range.end {
        range.start.format("%b %-d, %Y").to_string()
    } else {
        format!(
            "{} - {}",
            range.start.format("%b %-d"),
            range.end.format("%b %-d, %Y")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn mailer() -> Mailer {
        Mailer::new(EmailAddress::new("camps@example.com").with_name("CampHQ"))
    }

    #[test]
    fn test_checkout_confirmation_lists_lines() {
        let data = CheckoutConfirmation {
            parent_name: "Pat".into(),
            lines: vec![
                ConfirmationLine {
                    athlete_name: "Riley Parent".into(),
                    camp_name: "Summer Soccer".into(),
                    dates: DateRange::new(d(6, 8), d(6, 12)).unwrap(),
                    waitlisted: false,
                    total_cents: Cents(26_910),
                },
                ConfirmationLine {
                    athlete_name: "Jordan Parent".into(),
                    camp_name: "Hoops".into(),
                    dates: DateRange::new(d(7, 1), d(7, 1)).unwrap(),
                    waitlisted: true,
                    total_cents: Cents(19_900),
                },
            ],
            discount_cents: Cents(2_990),
            charged_cents: Cents(26_910),
            payment_ref: Some("manual_abc".into()),
        };

        let message = mailer().checkout_confirmation(EmailAddress::new("pat@example.com"), &data);
        assert!(message.has_tag("checkout"));
        assert!(message.text_body.contains("Summer Soccer (Jun 8 - Jun 12, 2026): $269.10"));
        assert!(message.text_body.contains("Hoops (Jul 1, 2026): WAITLISTED"));
        assert!(message.text_body.contains("Discount: -$29.90"));
        assert!(message.text_body.contains("Total charged: $269.10"));
        assert!(message.text_body.contains("waitlisted spot"));
    }

    #[test]
    fn test_invoice_subject_and_amounts() {
        let data = InvoiceIssued {
            tenant_name: "North Shore Camps".into(),
            period: ReportingPeriod::month(2026, 6).unwrap(),
            net_revenue_cents: Cents(1_000_000),
            rate: BasisPoints(800),
            royalty_due_cents: Cents(80_000),
        };
        let message = mailer().royalty_invoice_issued(EmailAddress::new("owner@example.com"), &data);
        assert_eq!(message.subject, "Royalty invoice for June 2026");
        assert!(message.text_body.contains("Royalty rate: 8%"));
        assert!(message.text_body.contains("Amount due: $800.00"));
    }

    #[test]
    fn test_contract_greets_contact_or_venue() {
        let mut data = ContractSent {
            tenant_name: "North Shore Camps".into(),
            contact_name: None,
            venue_name: "Lakeside Fields".into(),
            title: "Summer field rental".into(),
            term: DateRange::new(d(6, 1), d(8, 31)).unwrap(),
            fee_cents: Cents(500_000),
            deposit_cents: Cents(100_000),
        };
        let to = EmailAddress::new("fields@example.com");
        assert!(mailer().contract_sent(to.clone(), &data).text_body.starts_with("Hello Lakeside Fields"));
        data.contact_name = Some("Morgan".into());
        assert!(mailer().contract_sent(to, &data).text_body.starts_with("Hello Morgan"));
    }
}
