//! # Keyword Subcommand
//!
//! Parses an inbound message body and shows the consent and suppression
//! effects it would have, by applying it to fresh in-memory stores and
//! printing what they contain afterwards.

use clap::Args;
use serde_json::json;

use bcast_compliance::{
    apply_keyword, ConsentStore, InMemoryConsentStore, InMemorySuppressionStore, InboundKeyword,
};
use bcast_core::{PhoneE164, SendCategory, Timestamp};

/// Arguments for the keyword subcommand.
#[derive(Args, Debug)]
pub struct KeywordArgs {
    /// Sender phone number in E.164 format.
    pub phone: String,

    /// The inbound message body.
    pub text: String,
}

/// Show what an inbound message body does to consent and suppression.
pub fn execute(args: KeywordArgs) -> anyhow::Result<()> {
    let phone = PhoneE164::parse(&args.phone)?;
    let Some(keyword) = InboundKeyword::parse(&args.text) else {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "text": args.text,
                "keyword": null,
                "effect": "none",
            }))?
        );
        return Ok(());
    };

    let mut consent = InMemoryConsentStore::new();
    let mut suppression = InMemorySuppressionStore::new();
    let now = Timestamp::now();
    apply_keyword(&mut consent, &mut suppression, &phone, keyword, now);

    let marketing = consent.state(&phone, SendCategory::Marketing);
    let transactional = consent.state(&phone, SendCategory::Transactional);
    let entries = suppression.entries_for(&phone);
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "text": args.text,
            "keyword": format!("{keyword:?}"),
            "consent": {
                "marketing": format!("{marketing:?}"),
                "transactional": format!("{transactional:?}"),
            },
            "suppressions": entries,
        }))?
    );
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────
