use crate::error::{BridgeError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

pub const FILE_PREFIX: &str = "MT202_";
pub const FILE_SUFFIX: &str = ".txt";

const CRLF: &str = "\r\n";

/// Field 32A: value date, currency and interbank settled amount.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBlock {
    pub date: NaiveDate,
    pub currency: String,
    pub amount: Decimal,
}

impl ValueBlock {
    /// `yyMMdd`
    pub fn formatted_date(&self) -> String {
        self.date.format("%y%m%d").to_string()
    }

    /// SWIFT amounts use a decimal comma and always carry it, e.g. `10,` or `10,25`.
    pub fn formatted_amount(&self) -> String {
        let plain = self.amount.to_string().replace('.', ",");
        if plain.contains(',') {
            plain
        } else {
            format!("{plain},")
        }
    }
}

/// Field 58A: beneficiary institution.
#[derive(Debug, Clone, PartialEq)]
pub struct Beneficiary {
    pub account: String,
    pub bic: String,
}

/// A general financial institution transfer (MT202) with the fields this bridge populates.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementMessage {
    pub sender: String,
    pub receiver: String,
    pub uetr: String,
    pub transaction_reference: String,
    pub related_reference: String,
    pub value: ValueBlock,
    pub beneficiary: Beneficiary,
}

impl SettlementMessage {
    /// The UETR doubles as idempotency key, so it must be a canonical hyphenated UUID.
    pub fn validated_uetr(&self) -> Result<Uuid> {
        match Uuid::try_parse(&self.uetr) {
            Ok(uuid) if uuid.hyphenated().to_string() == self.uetr => Ok(uuid),
            _ => Err(BridgeError::InvalidUetr(self.uetr.clone())),
        }
    }

    /// File name the message is persisted under, e.g. `MT202_<uetr>.txt`.
    pub fn storage_key(&self) -> Result<String> {
        let uetr = self.validated_uetr()?;
        Ok(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", uetr.hyphenated()))
    }

    /// Renders the FIN text: basic header, application header, user header and text block.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(&format!("{{1:F01{}0000000000}}", self.sender));
        out.push_str(&format!("{{2:I202{}N}}", self.receiver));
        out.push_str(&format!("{{3:{{121:{}}}}}", self.uetr));
        out.push_str("{4:");
        out.push_str(CRLF);
        out.push_str(&format!(":20:{}{CRLF}", self.transaction_reference));
        out.push_str(&format!(":21:{}{CRLF}", self.related_reference));
        out.push_str(&format!(
            ":32A:{}{}{}{CRLF}",
            self.value.formatted_date(),
            self.value.currency,
            self.value.formatted_amount()
        ));
        out.push_str(&format!(":58A:/{}{CRLF}", self.beneficiary.account));
        out.push_str(&format!("{}{CRLF}", self.beneficiary.bic));
        out.push_str("-}");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn message(uetr: &str) -> SettlementMessage {
        SettlementMessage {
            sender: "payerBicAXXX".into(),
            receiver: "payeeBicXXXX".into(),
            uetr: uetr.into(),
            transaction_reference: "txRefCode".into(),
            related_reference: "txRefCode".into(),
            value: ValueBlock {
                date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
                currency: "USD".into(),
                amount: dec!(10),
            },
            beneficiary: Beneficiary {
                account: "payeeIban".into(),
                bic: "payeeBic".into(),
            },
        }
    }

    #[test]
    fn test_render_layout() {
        let uetr = "0b2f6c1e-8d0a-4c4e-9a57-3f0f1d2c3b4a";
        let expected = format!(
            "{{1:F01payerBicAXXX0000000000}}{{2:I202payeeBicXXXXN}}{{3:{{121:{uetr}}}}}\
             {{4:\r\n:20:txRefCode\r\n:21:txRefCode\r\n:32A:261016USD10,\r\n\
             :58A:/payeeIban\r\npayeeBic\r\n-}}"
        );
        assert_eq!(message(uetr).render(), expected);
    }

    #[test]
    fn test_formatted_amount_keeps_scale() {
        let mut block = message("x").value;
        block.amount = dec!(1250.50);
        assert_eq!(block.formatted_amount(), "1250,50");
        block.amount = dec!(0.0001);
        assert_eq!(block.formatted_amount(), "0,0001");
    }

    #[test]
    fn test_storage_key() {
        let msg = message("0b2f6c1e-8d0a-4c4e-9a57-3f0f1d2c3b4a");
        assert_eq!(
            msg.storage_key().unwrap(),
            "MT202_0b2f6c1e-8d0a-4c4e-9a57-3f0f1d2c3b4a.txt"
        );
    }

    #[test]
    fn test_malformed_uetr_rejected() {
        for bad in [
            "",
            "not-a-uuid",
            "../../etc/passwd",
            "0b2f6c1e8d0a4c4e9a573f0f1d2c3b4a",
            "{0b2f6c1e-8d0a-4c4e-9a57-3f0f1d2c3b4a}",
        ] {
            let err = message(bad).storage_key().unwrap_err();
            assert!(matches!(err, BridgeError::InvalidUetr(_)), "{bad} accepted");
        }
    }
}
