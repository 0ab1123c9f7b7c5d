use crate::domain::instrument::PaymentInstruction;
use crate::domain::settlement::{Beneficiary, SettlementMessage, ValueBlock};
use uuid::Uuid;

const SENDER_TERMINAL: char = 'A';
const RECEIVER_TERMINAL: char = 'X';

/// Builds the MT202 for a payment instruction, stamping a fresh UETR.
pub fn encode(instruction: &PaymentInstruction) -> SettlementMessage {
    encode_with_uetr(instruction, Uuid::new_v4())
}

/// Same as [`encode`] with a caller supplied UETR.
pub fn encode_with_uetr(instruction: &PaymentInstruction, uetr: Uuid) -> SettlementMessage {
    let payer = &instruction.payer_details;
    let payee = &instruction.payee_details;
    let reference = instruction.transaction_reference.clone();

    SettlementMessage {
        sender: logical_terminal(&payer.bic, SENDER_TERMINAL),
        receiver: logical_terminal(&payee.bic, RECEIVER_TERMINAL),
        uetr: uetr.hyphenated().to_string(),
        related_reference: reference.clone(),
        transaction_reference: reference,
        value: ValueBlock {
            date: instruction.payment_date.date_naive(),
            currency: instruction.currency.clone(),
            amount: instruction.amount,
        },
        beneficiary: Beneficiary {
            account: payee.iban.clone(),
            bic: payee.bic.clone(),
        },
    }
}

/// Expands a BIC into the 12 character header address.
///
/// BIC8 gets the terminal code and a `XXX` branch, BIC11 gets the terminal code spliced in
/// before its branch. Anything else is passed through untouched.
fn logical_terminal(bic: &str, terminal: char) -> String {
    if !bic.is_ascii() {
        return bic.to_string();
    }
    match bic.len() {
        8 => format!("{bic}{terminal}XXX"),
        11 => format!("{}{terminal}{}", &bic[..8], &bic[8..]),
        _ => bic.to_string(),
    }
}
