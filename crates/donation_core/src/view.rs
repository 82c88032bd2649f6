//! Presentation values derived from a [`DonationSnapshot`].

use shared::domain::{
    short_address, DonationStatus, CURRENCY, QUICK_AMOUNTS, RECIPIENT_ADDRESS, RECIPIENT_NAME,
};

use crate::{submit_ready, DonationSnapshot};

pub const PROCESSING_NOTICE: &str = "Processing payment...";
pub const FAILURE_NOTICE: &str = "Payment failed. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Banner {
    Processing,
    Failed,
}

impl Banner {
    pub fn text(self) -> &'static str {
        match self {
            Self::Processing => PROCESSING_NOTICE,
            Self::Failed => FAILURE_NOTICE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessSummary {
    pub headline: &'static str,
    pub detail: String,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationView {
    pub banner: Option<Banner>,
    pub submit_label: String,
    pub submit_enabled: bool,
    pub selected_preset: Option<&'static str>,
    pub recipient: String,
    pub network_label: &'static str,
    pub success: Option<SuccessSummary>,
}

impl DonationView {
    pub fn from_snapshot(snapshot: &DonationSnapshot) -> Self {
        let processing = snapshot.status == DonationStatus::Processing;

        let banner = match snapshot.status {
            DonationStatus::Processing => Some(Banner::Processing),
            DonationStatus::Failed => Some(Banner::Failed),
            DonationStatus::Idle | DonationStatus::Completed => None,
        };

        let submit_label = if processing {
            "Processing...".to_string()
        } else {
            let amount = if snapshot.amount.is_empty() {
                "0.00"
            } else {
                snapshot.amount.as_str()
            };
            format!("Donate ${amount} {CURRENCY}")
        };

        let success = (snapshot.status == DonationStatus::Completed).then(|| SuccessSummary {
            headline: "Payment Successful!",
            detail: format!("${} {CURRENCY} sent to {RECIPIENT_NAME}", snapshot.amount),
            transaction_id: snapshot.transaction_id.as_ref().map(|id| id.to_string()),
        });

        Self {
            banner,
            submit_label,
            submit_enabled: submit_ready(snapshot),
            selected_preset: QUICK_AMOUNTS
                .iter()
                .copied()
                .find(|preset| *preset == snapshot.amount),
            recipient: short_address(RECIPIENT_ADDRESS),
            network_label: snapshot.network.label(),
            success,
        }
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::{Network, TransactionId};

    use super::*;

    fn snapshot(status: DonationStatus, amount: &str) -> DonationSnapshot {
        DonationSnapshot {
            amount: amount.to_string(),
            network: Network::Testnet,
            status,
            ..DonationSnapshot::default()
        }
    }

    #[test]
    fn idle_form_offers_donate_button_for_amount() {
        let view = DonationView::from_snapshot(&snapshot(DonationStatus::Idle, "25.00"));
        assert_eq!(view.banner, None);
        assert_eq!(view.submit_label, "Donate $25.00 USDC");
        assert!(view.submit_enabled);
        assert_eq!(view.selected_preset, Some("25.00"));
        assert_eq!(view.recipient, "0xc707...9Fa0");
        assert_eq!(view.network_label, "Base Sepolia Testnet");
        assert!(view.success.is_none());
    }

    #[test]
    fn empty_amount_disables_submit() {
        let view = DonationView::from_snapshot(&snapshot(DonationStatus::Idle, ""));
        assert_eq!(view.submit_label, "Donate $0.00 USDC");
        assert!(!view.submit_enabled);
        assert_eq!(view.selected_preset, None);
    }

    #[test]
    fn processing_disables_submit_and_shows_notice() {
        let view = DonationView::from_snapshot(&snapshot(DonationStatus::Processing, "10.00"));
        assert_eq!(view.banner.map(Banner::text), Some(PROCESSING_NOTICE));
        assert_eq!(view.submit_label, "Processing...");
        assert!(!view.submit_enabled);
    }

    #[test]
    fn failure_shows_single_retry_notice() {
        let view = DonationView::from_snapshot(&snapshot(DonationStatus::Failed, "10.00"));
        assert_eq!(view.banner.map(Banner::text), Some(FAILURE_NOTICE));
        assert_eq!(view.submit_label, "Donate $10.00 USDC");
        assert!(!view.submit_enabled);
    }

    #[test]
    fn only_idle_form_enables_submit() {
        for status in [
            DonationStatus::Processing,
            DonationStatus::Completed,
            DonationStatus::Failed,
        ] {
            let view = DonationView::from_snapshot(&snapshot(status, "10.00"));
            assert!(!view.submit_enabled, "{status} must not offer submit");
        }
        assert!(DonationView::from_snapshot(&snapshot(DonationStatus::Idle, "10.00")).submit_enabled);
    }

    #[test]
    fn completion_summarizes_transfer() {
        let mut completed = snapshot(DonationStatus::Completed, "5.00");
        completed.transaction_id = Some(TransactionId("tx123".into()));

        let success = DonationView::from_snapshot(&completed)
            .success
            .expect("success summary");
        assert_eq!(success.detail, "$5.00 USDC sent to Joshua");
        assert_eq!(success.transaction_id.as_deref(), Some("tx123"));
    }
}
