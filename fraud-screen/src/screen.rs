//! Rule-based screening engine

use crate::types::{Judgment, TxContext, Verdict};
use chrono::Utc;

/// Screening interface consumed by calling layers
pub trait FraudScreen {
    /// Judge a proposed transaction
    fn judge(&self, tx: &TxContext) -> Judgment;
}

/// Deterministic rule-based screen
///
/// Scores the wallet's recent purchase velocity, escalated by the
/// fraud-prone hint, and maps the score to a verdict at fixed thresholds.
#[derive(Debug, Clone)]
pub struct RuleScreen {
    /// Score at or above which a wallet is suspect
    pub suspect_score: u32,

    /// Score at or above which a wallet is judged fraudulent
    pub fraud_score: u32,
}

impl Default for RuleScreen {
    fn default() -> Self {
        Self {
            suspect_score: 4,
            fraud_score: 8,
        }
    }
}

impl FraudScreen for RuleScreen {
    fn judge(&self, tx: &TxContext) -> Judgment {
        let mut score = tx.recent_purchases;
        let mut factors = Vec::new();

        if tx.recent_purchases >= self.suspect_score {
            factors.push(format!(
                "{} purchases in the recent window",
                tx.recent_purchases
            ));
        }

        if tx.fraud_prone {
            score += 3;
            factors.push("wallet flagged fraud-prone".to_string());
        }

        let verdict = if score >= self.fraud_score {
            Verdict::Fraud
        } else if score >= self.suspect_score {
            Verdict::Suspect
        } else {
            Verdict::Normal
        };

        if verdict != Verdict::Normal {
            tracing::warn!(wallet = %tx.wallet, ?verdict, "screening flagged wallet");
        }

        Judgment {
            wallet: tx.wallet.clone(),
            verdict,
            factors,
            judged_at: Utc::now(),
        }
    }
}
