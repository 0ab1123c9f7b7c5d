use crate::domain::event::ContractEvent;
use crate::domain::instrument::{CouponEvent, KnockOutEvent, LedgerEvent, PaymentInstruction};
use crate::domain::ports::{EventHandler, NotificationSinkBox, OutputSinkBox};
use crate::domain::settlement::SettlementMessage;
use crate::error::Result;
use crate::interfaces::swift::codec;
use async_trait::async_trait;
use tracing::{debug, error, info, trace};

/// Routes ledger events to their handlers.
///
/// Coupon and knock-out events only produce a notification. Payment instructions are encoded into
/// an MT202, persisted through the output sink and then announced, in that order, so the
/// announced UETR always refers to a file that was at least attempted.
pub struct EventDispatcher {
    notifier: NotificationSinkBox,
    output: OutputSinkBox,
}

impl EventDispatcher {
    pub fn new(notifier: NotificationSinkBox, output: OutputSinkBox) -> Self {
        Self { notifier, output }
    }

    async fn on_coupon(&self, event: CouponEvent) {
        debug!(trade_id = %event.trade_id, "CouponEvent received");
        self.notifier.send(&coupon_text(&event)).await;
    }

    async fn on_knock_out(&self, event: KnockOutEvent) {
        debug!(trade_id = %event.trade_id, "KnockOutEvent received");
        self.notifier.send(&knock_out_text(&event)).await;
    }

    async fn on_payment(&self, instruction: PaymentInstruction) {
        debug!(reference = %instruction.transaction_reference, "PaymentInstruction received");
        let message = codec::encode(&instruction);
        info!(uetr = %message.uetr, "Sending SWIFT message: {}", message.render());

        self.output.write(&message).await;
        self.notifier.send(&payment_text(&message)).await;
    }
}

#[async_trait]
impl EventHandler for EventDispatcher {
    async fn accept(&self, event: ContractEvent) -> Result<()> {
        trace!(event_id = event.event_id(), template = %event.template_id(), "Accepted event");

        let ContractEvent::Created(created) = event else {
            return Ok(());
        };

        let event_id = created.event_id.clone();
        let decoded = LedgerEvent::decode(created).inspect_err(|err| {
            error!(event_id = %event_id, error = %err, "Error processing event");
        })?;

        match decoded {
            LedgerEvent::Coupon(event) => self.on_coupon(event).await,
            LedgerEvent::KnockOut(event) => self.on_knock_out(event).await,
            LedgerEvent::Payment(instruction) => self.on_payment(instruction).await,
            LedgerEvent::Other(template) => {
                trace!(event_id = %event_id, template = %template, "No handler for template");
            }
        }
        Ok(())
    }
}

pub fn coupon_text(event: &CouponEvent) -> String {
    format!(
        "Coupon event occurred on trade {} between {} and {}",
        event.trade_id, event.issuer, event.owner
    )
}

pub fn knock_out_text(event: &KnockOutEvent) -> String {
    format!(
        "DCN {} has knocked out, reason: {}",
        event.trade_id,
        event.reason()
    )
}

pub fn payment_text(message: &SettlementMessage) -> String {
    format!(
        "SWIFT transfer initiated from {} to beneficiary {} for {} {} on {} (ref={}, id={})",
        message.sender,
        message.receiver,
        message.value.amount,
        message.value.currency,
        message.value.formatted_date(),
        message.transaction_reference,
        message.uetr
    )
}
