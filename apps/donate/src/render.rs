//! Plain-text rendering of the donation form and its outcome.

use std::fmt::Write as _;

use donation_core::{Banner, DonationSnapshot, DonationView};
use shared::domain::{CURRENCY, QUICK_AMOUNTS, RECIPIENT_NAME};

pub fn render(snapshot: &DonationSnapshot) -> String {
    let view = DonationView::from_snapshot(snapshot);
    match &view.success {
        Some(success) => {
            let mut out = format!("{}\n{}\n", success.headline, success.detail);
            if let Some(id) = &success.transaction_id {
                let _ = writeln!(out, "TX ID: {id}");
            }
            out.push_str("Run `reset` to make another donation.\n");
            out
        }
        None => render_form(&view, &snapshot.amount),
    }
}

fn render_form(view: &DonationView, amount: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Donate to {RECIPIENT_NAME}");
    let _ = writeln!(out, "Send {CURRENCY} on Base Network");
    let _ = writeln!(out);
    let _ = writeln!(out, "Network: {}", view.network_label);
    let _ = writeln!(out, "Amount:  ${amount}");

    let presets = QUICK_AMOUNTS
        .iter()
        .map(|preset| {
            if view.selected_preset == Some(*preset) {
                format!("[${preset}]")
            } else {
                format!(" ${preset} ")
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    let _ = writeln!(out, "Presets: {presets}");

    if let Some(banner) = view.banner {
        let _ = writeln!(out, "{}", banner.text());
        if banner == Banner::Failed {
            let _ = writeln!(out, "Run `retry` to try again or `reset` to edit the form.");
        }
    }

    if view.submit_enabled {
        let _ = writeln!(out, "[ {} ]", view.submit_label);
    } else {
        let _ = writeln!(out, "( {} - unavailable )", view.submit_label);
    }
    let _ = writeln!(out, "Recipient: {}", view.recipient);
    out
}
