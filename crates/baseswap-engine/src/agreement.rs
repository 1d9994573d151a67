//! The swap agreement aggregate.
//!
//! Every mutating call follows the same sequence:
//! 1. Gate on lifecycle (terminal state, expiration, owner)
//! 2. Validate against the side ledger (limit, investor cap, zero amount)
//! 3. Pull any incoming value through the adapter
//! 4. Snapshot state, then apply **all** bookkeeping (ledgers, terminal flags)
//! 5. Preflight and execute outgoing transfers
//! 6. On failure before any payout leaves escrow: restore the snapshot,
//!    return any pulled value, surface the error
//!
//! Once one payout has gone out the call commits. Payouts the adapter
//! refuses after that point are kept as deferred payouts and reported
//! with [`SwapEvent::PayoutDeferred`]; [`SwapAgreement::retry_unpaid`]
//! sends them later.
//!
//! State is updated before any outgoing transfer, so a re-entrant call
//! observes the post-operation state.

use baseswap_ledger::{
    Contribution, LifecycleController, Payout, SettlementEngine, SettlementPlan, SideLedger,
};
use baseswap_types::{
    AccountId, AgreementId, Amount, AssetHandle, Result, Share, Side, SwapConfig, SwapError,
    SwapEvent, SwapStatus,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapter::AssetAdapter;
use crate::context::CallContext;
use crate::holdings;

/// Mutable state; cloned as the rollback snapshot.
#[derive(Debug, Clone)]
struct AgreementState {
    base: SideLedger,
    quote: SideLedger,
    lifecycle: LifecycleController,
    last_settlement: Option<SettlementPlan>,
    /// Payouts still owed from a partially executed disbursement.
    unpaid: Vec<Payout>,
}

impl AgreementState {
    fn ledger(&self, side: Side) -> &SideLedger {
        match side {
            Side::Base => &self.base,
            Side::Quote => &self.quote,
        }
    }

    fn ledger_mut(&mut self, side: Side) -> &mut SideLedger {
        match side {
            Side::Base => &mut self.base,
            Side::Quote => &mut self.quote,
        }
    }
}

/// Two pooled sides, swapped pro-rata once both are fully funded.
#[derive(Debug)]
pub struct SwapAgreement {
    id: AgreementId,
    config: SwapConfig,
    created_at: DateTime<Utc>,
    state: AgreementState,
    /// Append-only notification log.
    events: Vec<SwapEvent>,
}

impl SwapAgreement {
    /// Validate `config` against `created_at` and open the agreement.
    ///
    /// # Errors
    /// [`SwapError::InvalidConfiguration`]; no agreement is created.
    pub fn new(config: SwapConfig, created_at: DateTime<Utc>) -> Result<Self> {
        config.validate(created_at).inspect_err(|err| {
            tracing::warn!(error = %err, "swap agreement rejected");
        })?;

        let id = config.agreement_id();
        let state = AgreementState {
            base: SideLedger::new(Side::Base, config.base_limit, config.max_investors),
            quote: SideLedger::new(Side::Quote, config.quote_limit, config.max_investors),
            lifecycle: LifecycleController::new(config.owner, config.expiration),
            last_settlement: None,
            unpaid: Vec::new(),
        };

        tracing::info!(
            %id,
            base_asset = %config.base_asset,
            quote_asset = %config.quote_asset,
            base_limit = config.base_limit,
            quote_limit = config.quote_limit,
            expiration = %config.expiration,
            "swap agreement opened"
        );

        Ok(Self {
            id,
            config,
            created_at,
            state,
            events: Vec::new(),
        })
    }

    // =================================================================
    // Deposits
    // =================================================================

    /// Deposit the call's attached native value into the native side.
    ///
    /// # Errors
    /// `AssetMismatch` if neither side is native, plus every deposit error.
    pub fn deposit_native<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        ctx: &CallContext,
    ) -> Result<Vec<SwapEvent>> {
        let side = self
            .config
            .native_side()
            .ok_or_else(|| SwapError::AssetMismatch {
                reason: "no side accepts native value".to_string(),
            });
        side.and_then(|side| self.deposit_into(adapter, side, ctx.caller, ctx.value, ctx.now))
            .inspect_err(|err| self.log_rejection("deposit_native", ctx.caller, err))
    }

    /// Pull `amount` of the side's token from the caller.
    ///
    /// # Errors
    /// `AssetMismatch` if `side` is native or native value is attached,
    /// `TransferFailed` if the pull fails, plus every deposit error.
    pub fn deposit_token<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        ctx: &CallContext,
        side: Side,
        amount: Amount,
    ) -> Result<Vec<SwapEvent>> {
        self.token_side_check(ctx, side)
            .and_then(|()| self.deposit_into(adapter, side, ctx.caller, amount, ctx.now))
            .inspect_err(|err| self.log_rejection("deposit_token", ctx.caller, err))
    }

    /// Deposit the caller's entire current allowance of the side's token.
    ///
    /// # Errors
    /// As [`deposit_token`](Self::deposit_token); a zero allowance is `ZeroAmount`.
    pub fn deposit_token_allowance<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        ctx: &CallContext,
        side: Side,
    ) -> Result<Vec<SwapEvent>> {
        let amount = match self.config.asset(side) {
            AssetHandle::Token(token) => adapter.allowance(token, ctx.caller),
            AssetHandle::Native => 0,
        };
        self.deposit_token(adapter, ctx, side, amount)
    }

    fn token_side_check(&self, ctx: &CallContext, side: Side) -> Result<()> {
        if self.config.asset(side).is_native() {
            return Err(SwapError::AssetMismatch {
                reason: format!("{side} side holds native currency, not a token"),
            });
        }
        if ctx.value > 0 {
            return Err(SwapError::AssetMismatch {
                reason: format!("native value {} attached to token deposit", ctx.value),
            });
        }
        Ok(())
    }

    fn deposit_into<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        side: Side,
        depositor: AccountId,
        amount: Amount,
        now: DateTime<Utc>,
    ) -> Result<Vec<SwapEvent>> {
        self.state.lifecycle.deposit_gate(now)?;
        self.state.ledger(side).check_deposit(depositor, amount)?;

        let asset = self.config.asset(side);
        adapter.transfer_in(asset, depositor, amount)?;

        let snapshot = self.state.clone();
        match self.apply_deposit(adapter, side, depositor, amount) {
            Ok(events) => Ok(self.emit(events)),
            Err(err) => {
                // Nothing has left escrow, so the pulled value is still there.
                self.state = snapshot;
                tracing::warn!(%depositor, %side, amount, error = %err, "deposit rolled back");
                if let Err(refund_err) = adapter.transfer_out(asset, depositor, amount) {
                    tracing::error!(
                        %depositor,
                        amount,
                        error = %refund_err,
                        "failed to return pulled deposit"
                    );
                    return Err(SwapError::Internal(format!(
                        "deposit rollback could not return {amount} {asset} to {depositor}: \
                         {refund_err}"
                    )));
                }
                Err(err)
            }
        }
    }

    /// Bookkeeping plus any triggered settlement. The caller restores
    /// state on error; an error means no payout left escrow.
    fn apply_deposit<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        side: Side,
        depositor: AccountId,
        amount: Amount,
    ) -> Result<Vec<SwapEvent>> {
        let cumulative = self.state.ledger_mut(side).record_deposit(depositor, amount)?;
        tracing::info!(
            id = %self.id,
            %side,
            %depositor,
            amount,
            cumulative,
            raised = self.state.ledger(side).raised(),
            "deposit accepted"
        );

        let mut events = vec![SwapEvent::Deposit {
            asset: self.config.asset(side),
            depositor,
            amount,
            cumulative,
        }];

        if SettlementEngine::is_triggered(&self.state.base, &self.state.quote) {
            self.state.lifecycle.mark_swapped()?;
            let plan = SettlementEngine::plan(&self.state.base, &self.state.quote)?;
            self.state.last_settlement = Some(plan.clone());
            let unpaid = self.disburse(adapter, &plan.payouts)?;
            tracing::info!(
                id = %self.id,
                triggered_by = %depositor,
                payouts = plan.payouts.len(),
                deferred = unpaid.len(),
                base_dust = plan.base_dust,
                quote_dust = plan.quote_dust,
                "swap settled"
            );
            events.extend(self.defer(unpaid));
            events.push(SwapEvent::Swap {
                triggered_by: depositor,
            });
        }
        Ok(events)
    }

    // =================================================================
    // Cancel / refund
    // =================================================================

    /// Owner-only, pre-expiration cancellation: return every deposit on
    /// both sides and lock the agreement as cancelled.
    ///
    /// # Errors
    /// `AlreadyTerminal`, `Expired`, `Unauthorized`, or an adapter failure.
    pub fn cancel<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        ctx: &CallContext,
    ) -> Result<Vec<SwapEvent>> {
        self.state
            .lifecycle
            .authorize_cancel(ctx.caller, ctx.now)
            .and_then(|()| {
                self.transact(adapter, |state| {
                    let mut payouts = Payout::refunds(Side::Base, &state.base.clear());
                    payouts.extend(Payout::refunds(Side::Quote, &state.quote.clear()));
                    state.lifecycle.mark_cancelled()?;
                    Ok(payouts)
                })
            })
            .map(|(refunds, mut events)| {
                tracing::info!(id = %self.id, by = %ctx.caller, refunds, "swap cancelled");
                events.push(SwapEvent::Cancel { by: ctx.caller });
                self.emit(events)
            })
            .inspect_err(|err| self.log_rejection("cancel", ctx.caller, err))
    }

    /// Post-expiration refund of one side to all of its current investors.
    /// Any caller may trigger it; the agreement stays open.
    ///
    /// # Errors
    /// `AlreadyTerminal`, `NotExpired`, or an adapter failure.
    pub fn refund<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        ctx: &CallContext,
        side: Side,
    ) -> Result<Vec<SwapEvent>> {
        self.state
            .lifecycle
            .authorize_refund(ctx.now)
            .and_then(|()| {
                self.transact(adapter, |state| {
                    Ok(Payout::refunds(side, &state.ledger_mut(side).clear()))
                })
            })
            .map(|(refunds, mut events)| {
                tracing::info!(id = %self.id, %side, by = %ctx.caller, refunds, "side refunded");
                events.push(SwapEvent::Refund {
                    side,
                    by: ctx.caller,
                });
                self.emit(events)
            })
            .inspect_err(|err| self.log_rejection("refund", ctx.caller, err))
    }

    /// Re-send every deferred payout. Any caller may trigger it, in any
    /// status; payouts refused again stay deferred.
    pub fn retry_unpaid<A: AssetAdapter + ?Sized>(
        &mut self,
        adapter: &mut A,
        ctx: &CallContext,
    ) -> Vec<SwapEvent> {
        let pending = std::mem::take(&mut self.state.unpaid);
        let mut events = Vec::with_capacity(pending.len());
        for payout in pending {
            let asset = self.config.asset(payout.pool);
            let sent = adapter
                .check_transfer_out(asset, payout.recipient, payout.amount)
                .and_then(|()| adapter.transfer_out(asset, payout.recipient, payout.amount));
            match sent {
                Ok(()) => events.push(SwapEvent::DeferredPayoutSent {
                    asset,
                    recipient: payout.recipient,
                    amount: payout.amount,
                }),
                Err(err) => {
                    tracing::warn!(
                        %asset,
                        recipient = %payout.recipient,
                        error = %err,
                        "payout still refused"
                    );
                    self.state.unpaid.push(payout);
                }
            }
        }
        tracing::info!(
            id = %self.id,
            by = %ctx.caller,
            sent = events.len(),
            pending = self.state.unpaid.len(),
            "deferred payouts retried"
        );
        self.emit(events)
    }

    /// Apply `mutate`, then disburse the payouts it returns. Restores the
    /// snapshot if `mutate` fails or no payout could be sent; returns the
    /// payout count and the events for any deferred payouts.
    fn transact<A, F>(&mut self, adapter: &mut A, mutate: F) -> Result<(usize, Vec<SwapEvent>)>
    where
        A: AssetAdapter + ?Sized,
        F: FnOnce(&mut AgreementState) -> Result<Vec<Payout>>,
    {
        let snapshot = self.state.clone();
        let outcome = mutate(&mut self.state).and_then(|payouts| {
            let unpaid = self.disburse(adapter, &payouts)?;
            Ok((payouts.len(), unpaid))
        });
        match outcome {
            Ok((count, unpaid)) => Ok((count, self.defer(unpaid))),
            Err(err) => {
                self.state = snapshot;
                Err(err)
            }
        }
    }

    /// Preflight every payout, then execute them in order.
    ///
    /// An error means no payout left escrow. After the first transfer
    /// succeeds, refused payouts are returned instead so the caller can
    /// commit and defer them.
    fn disburse<A: AssetAdapter + ?Sized>(
        &self,
        adapter: &mut A,
        payouts: &[Payout],
    ) -> Result<Vec<Payout>> {
        let owed: Vec<Payout> = payouts.iter().chain(&self.state.unpaid).copied().collect();
        holdings::ensure_covered(&*adapter, &holdings::required_by_asset(&self.config, &owed))?;
        for payout in payouts {
            let asset = self.config.asset(payout.pool);
            adapter.check_transfer_out(asset, payout.recipient, payout.amount)?;
        }

        let mut sent = 0usize;
        let mut unpaid = Vec::new();
        for payout in payouts.iter().filter(|p| p.amount > 0) {
            let asset = self.config.asset(payout.pool);
            match adapter.transfer_out(asset, payout.recipient, payout.amount) {
                Ok(()) => {
                    sent += 1;
                    tracing::debug!(
                        %asset,
                        recipient = %payout.recipient,
                        amount = payout.amount,
                        "payout"
                    );
                }
                Err(err) if sent == 0 => return Err(err),
                Err(err) => {
                    tracing::error!(
                        id = %self.id,
                        %asset,
                        recipient = %payout.recipient,
                        amount = payout.amount,
                        error = %err,
                        "payout refused after disbursement began"
                    );
                    unpaid.push(*payout);
                }
            }
        }
        Ok(unpaid)
    }

    /// Record refused payouts as owed and describe them as events.
    fn defer(&mut self, unpaid: Vec<Payout>) -> Vec<SwapEvent> {
        let events = unpaid
            .iter()
            .map(|payout| SwapEvent::PayoutDeferred {
                asset: self.config.asset(payout.pool),
                recipient: payout.recipient,
                amount: payout.amount,
            })
            .collect();
        self.state.unpaid.extend(unpaid);
        events
    }

    fn emit(&mut self, events: Vec<SwapEvent>) -> Vec<SwapEvent> {
        self.events.extend(events.iter().cloned());
        events
    }

    fn log_rejection(&self, op: &str, caller: AccountId, err: &SwapError) {
        tracing::warn!(id = %self.id, op, %caller, error = %err, "operation rejected");
    }

    // =================================================================
    // Reads
    // =================================================================

    #[must_use]
    pub fn id(&self) -> AgreementId {
        self.id
    }

    #[must_use]
    pub fn config(&self) -> &SwapConfig {
        &self.config
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn owner(&self) -> AccountId {
        self.config.owner
    }

    #[must_use]
    pub fn asset(&self, side: Side) -> AssetHandle {
        self.config.asset(side)
    }

    #[must_use]
    pub fn limit(&self, side: Side) -> Amount {
        self.config.limit(side)
    }

    #[must_use]
    pub fn raised(&self, side: Side) -> Amount {
        self.state.ledger(side).raised()
    }

    #[must_use]
    pub fn is_full(&self, side: Side) -> bool {
        self.state.ledger(side).is_full()
    }

    #[must_use]
    pub fn investors(&self, side: Side) -> &[AccountId] {
        self.state.ledger(side).investors()
    }

    #[must_use]
    pub fn contribution(&self, side: Side, investor: AccountId) -> Amount {
        self.state.ledger(side).contribution(investor)
    }

    #[must_use]
    pub fn share_of(&self, side: Side, investor: AccountId) -> Option<Share> {
        self.state.ledger(side).share_of(investor)
    }

    #[must_use]
    pub fn status(&self) -> SwapStatus {
        self.state.lifecycle.status()
    }

    #[must_use]
    pub fn is_swapped(&self) -> bool {
        self.state.lifecycle.is_swapped()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state.lifecycle.is_cancelled()
    }

    #[must_use]
    pub fn expiration(&self) -> DateTime<Utc> {
        self.config.expiration
    }

    #[must_use]
    pub fn max_investors(&self) -> usize {
        self.config.max_investors
    }

    #[must_use]
    pub fn events(&self) -> &[SwapEvent] {
        &self.events
    }

    #[must_use]
    pub fn last_settlement(&self) -> Option<&SettlementPlan> {
        self.state.last_settlement.as_ref()
    }

    /// Payouts refused after their disbursement began, still owed.
    #[must_use]
    pub fn unpaid(&self) -> &[Payout] {
        &self.state.unpaid
    }

    /// Check the ledgers against the adapter's actual escrow holdings.
    ///
    /// Only meaningful while open; after a swap the ledgers are a
    /// historical record and the pools have been paid out.
    pub fn verify_backing<A: AssetAdapter + ?Sized>(&self, adapter: &A) -> Result<()> {
        holdings::verify_backing(adapter, &self.config, &self.state.base, &self.state.quote)
    }

    #[must_use]
    pub fn snapshot(&self) -> AgreementSnapshot {
        let side = |s: Side| SideSnapshot {
            raised: self.raised(s),
            limit: self.limit(s),
            contributions: self.state.ledger(s).entries(),
        };
        AgreementSnapshot {
            id: self.id,
            config: self.config.clone(),
            created_at: self.created_at,
            status: self.status(),
            base: side(Side::Base),
            quote: side(Side::Quote),
            last_settlement: self.state.last_settlement.clone(),
            unpaid: self.state.unpaid.clone(),
        }
    }
}

/// Serializable view of one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideSnapshot {
    pub raised: Amount,
    pub limit: Amount,
    /// Insertion-ordered.
    pub contributions: Vec<Contribution>,
}

/// Serializable view of the full agreement field set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementSnapshot {
    pub id: AgreementId,
    pub config: SwapConfig,
    pub created_at: DateTime<Utc>,
    pub status: SwapStatus,
    pub base: SideSnapshot,
    pub quote: SideSnapshot,
    pub last_settlement: Option<SettlementPlan>,
    pub unpaid: Vec<Payout>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryAssets;
    use baseswap_types::TokenId;
    use chrono::Duration;

    struct Fixture {
        swap: SwapAgreement,
        book: InMemoryAssets,
        token: TokenId,
        now: DateTime<Utc>,
    }

    /// Native base (limit 10), token quote (limit 20), cap 3.
    fn fixture() -> Fixture {
        let now = Utc::now();
        let token = TokenId::random();
        let mut cfg = SwapConfig::dummy(10, 20).with_max_investors(3);
        cfg.quote_asset = AssetHandle::Token(token);
        cfg.expiration = now + Duration::minutes(1);
        Fixture {
            swap: SwapAgreement::new(cfg, now).unwrap(),
            book: InMemoryAssets::new(AccountId::new()),
            token,
            now,
        }
    }

    impl Fixture {
        fn funded(&mut self, native: Amount, tokens: Amount) -> AccountId {
            let who = AccountId::new();
            self.book.mint(AssetHandle::Native, who, native);
            self.book.mint(AssetHandle::Token(self.token), who, tokens);
            self.book.approve(self.token, who, tokens);
            who
        }
    }

    #[test]
    fn native_deposit_records_and_emits() {
        let mut f = fixture();
        let alice = f.funded(10, 0);
        let ctx = CallContext::new(alice, f.now).with_value(4);
        let events = f.swap.deposit_native(&mut f.book, &ctx).unwrap();
        assert_eq!(
            events,
            vec![SwapEvent::Deposit {
                asset: AssetHandle::Native,
                depositor: alice,
                amount: 4,
                cumulative: 4
            }]
        );
        assert_eq!(f.swap.raised(Side::Base), 4);
        assert_eq!(f.book.balance_of(AssetHandle::Native, alice), 6);
        assert!(f.swap.verify_backing(&f.book).is_ok());
    }

    #[test]
    fn token_deposit_on_native_side_is_mismatch() {
        let mut f = fixture();
        let alice = f.funded(10, 10);
        let err = f
            .swap
            .deposit_token(&mut f.book, &CallContext::new(alice, f.now), Side::Base, 5)
            .unwrap_err();
        assert!(matches!(err, SwapError::AssetMismatch { .. }));
    }

    #[test]
    fn token_deposit_with_attached_value_is_mismatch() {
        let mut f = fixture();
        let alice = f.funded(10, 10);
        let ctx = CallContext::new(alice, f.now).with_value(1);
        let err = f
            .swap
            .deposit_token(&mut f.book, &ctx, Side::Quote, 5)
            .unwrap_err();
        assert!(matches!(err, SwapError::AssetMismatch { .. }));
        assert_eq!(f.swap.raised(Side::Quote), 0);
    }

    #[test]
    fn failed_pull_leaves_ledger_untouched() {
        let mut f = fixture();
        let alice = f.funded(0, 3);
        let err = f
            .swap
            .deposit_token(&mut f.book, &CallContext::new(alice, f.now), Side::Quote, 5)
            .unwrap_err();
        assert!(matches!(err, SwapError::TransferFailed { .. }));
        assert_eq!(f.swap.raised(Side::Quote), 0);
        assert!(f.swap.investors(Side::Quote).is_empty());
        assert!(f.swap.events().is_empty());
    }

    #[test]
    fn allowance_deposit_pulls_everything_approved() {
        let mut f = fixture();
        let alice = f.funded(0, 7);
        f.swap
            .deposit_token_allowance(&mut f.book, &CallContext::new(alice, f.now), Side::Quote)
            .unwrap();
        assert_eq!(f.swap.contribution(Side::Quote, alice), 7);
        assert_eq!(f.book.allowance(f.token, alice), 0);

        let err = f
            .swap
            .deposit_token_allowance(&mut f.book, &CallContext::new(alice, f.now), Side::Quote)
            .unwrap_err();
        assert!(matches!(err, SwapError::ZeroAmount));
    }

    #[test]
    fn settlement_fires_when_second_side_fills() {
        let mut f = fixture();
        let alice = f.funded(10, 0);
        let bob = f.funded(0, 20);
        f.swap
            .deposit_native(&mut f.book, &CallContext::new(alice, f.now).with_value(10))
            .unwrap();
        assert!(!f.swap.is_swapped());

        let events = f
            .swap
            .deposit_token(&mut f.book, &CallContext::new(bob, f.now), Side::Quote, 20)
            .unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], SwapEvent::Swap { triggered_by: bob });
        assert!(f.swap.is_swapped());
        assert_eq!(f.book.balance_of(AssetHandle::Token(f.token), alice), 20);
        assert_eq!(f.book.balance_of(AssetHandle::Native, bob), 10);
        // Ledger state is frozen as a historical record.
        assert_eq!(f.swap.raised(Side::Base), 10);
        assert_eq!(f.swap.investors(Side::Quote), &[bob]);
    }

    #[test]
    fn blocked_recipient_rolls_back_triggering_deposit() {
        let mut f = fixture();
        let alice = f.funded(10, 0);
        let bob = f.funded(0, 20);
        f.swap
            .deposit_native(&mut f.book, &CallContext::new(alice, f.now).with_value(10))
            .unwrap();
        f.book.block_recipient(alice);

        let err = f
            .swap
            .deposit_token(&mut f.book, &CallContext::new(bob, f.now), Side::Quote, 20)
            .unwrap_err();
        assert!(matches!(err, SwapError::TransferFailed { .. }));
        assert!(!f.swap.is_swapped());
        assert_eq!(f.swap.raised(Side::Quote), 0);
        assert!(f.swap.last_settlement().is_none());
        // Pulled tokens went back to bob; alice's deposit is still pooled.
        assert_eq!(f.book.balance_of(AssetHandle::Token(f.token), bob), 20);
        assert_eq!(f.swap.raised(Side::Base), 10);
        assert!(f.swap.verify_backing(&f.book).is_ok());
        assert_eq!(f.swap.events().len(), 1);
    }

    #[test]
    fn cancel_returns_both_sides() {
        let mut f = fixture();
        let alice = f.funded(10, 0);
        let bob = f.funded(0, 20);
        f.swap
            .deposit_native(&mut f.book, &CallContext::new(alice, f.now).with_value(3))
            .unwrap();
        f.swap
            .deposit_token(&mut f.book, &CallContext::new(bob, f.now), Side::Quote, 8)
            .unwrap();

        let owner = f.swap.owner();
        let events = f.swap.cancel(&mut f.book, &CallContext::new(owner, f.now)).unwrap();
        assert_eq!(events, vec![SwapEvent::Cancel { by: owner }]);
        assert!(f.swap.is_cancelled());
        assert_eq!(f.book.balance_of(AssetHandle::Native, alice), 10);
        assert_eq!(f.book.balance_of(AssetHandle::Token(f.token), bob), 20);
        assert_eq!(f.swap.raised(Side::Base), 0);
        assert!(f.swap.investors(Side::Quote).is_empty());
    }

    #[test]
    fn cancel_failure_restores_state() {
        let mut f = fixture();
        let alice = f.funded(10, 0);
        f.swap
            .deposit_native(&mut f.book, &CallContext::new(alice, f.now).with_value(3))
            .unwrap();
        f.book.block_recipient(alice);

        let owner = f.swap.owner();
        assert!(f.swap.cancel(&mut f.book, &CallContext::new(owner, f.now)).is_err());
        assert_eq!(f.swap.status(), SwapStatus::Open);
        assert_eq!(f.swap.contribution(Side::Base, alice), 3);
    }

    #[test]
    fn refund_clears_one_side_only() {
        let mut f = fixture();
        let alice = f.funded(10, 0);
        let bob = f.funded(0, 20);
        f.swap
            .deposit_native(&mut f.book, &CallContext::new(alice, f.now).with_value(5))
            .unwrap();
        f.swap
            .deposit_token(&mut f.book, &CallContext::new(bob, f.now), Side::Quote, 6)
            .unwrap();

        let late = CallContext::new(AccountId::new(), f.now + Duration::minutes(2));
        let events = f.swap.refund(&mut f.book, &late, Side::Base).unwrap();
        assert_eq!(
            events,
            vec![SwapEvent::Refund {
                side: Side::Base,
                by: late.caller
            }]
        );
        assert_eq!(f.book.balance_of(AssetHandle::Native, alice), 10);
        assert_eq!(f.swap.raised(Side::Base), 0);
        assert_eq!(f.swap.raised(Side::Quote), 6);
        assert_eq!(f.swap.status(), SwapStatus::Open);

        // Refunding an emptied side is a no-op that still succeeds.
        assert!(f.swap.refund(&mut f.book, &late, Side::Base).is_ok());
    }

    #[test]
    fn snapshot_serializes() {
        let mut f = fixture();
        let alice = f.funded(10, 0);
        f.swap
            .deposit_native(&mut f.book, &CallContext::new(alice, f.now).with_value(2))
            .unwrap();
        let snap = f.swap.snapshot();
        assert_eq!(snap.base.contributions[0].investor, alice);
        let json = serde_json::to_string(&snap).unwrap();
        let back: AgreementSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snap, back);
    }

    // =================================================================
    // Payouts refused mid-disbursement
    // =================================================================

    /// Book whose `fail_on`-th outgoing transfer fails without moving
    /// anything, even though its preflight passed.
    struct FlakyBook {
        book: InMemoryAssets,
        fail_on: usize,
        outgoing: usize,
    }

    impl AssetAdapter for FlakyBook {
        fn escrow_account(&self) -> AccountId {
            self.book.escrow_account()
        }

        fn transfer_in(
            &mut self,
            asset: AssetHandle,
            from: AccountId,
            amount: Amount,
        ) -> Result<()> {
            self.book.transfer_in(asset, from, amount)
        }

        fn transfer_out(
            &mut self,
            asset: AssetHandle,
            to: AccountId,
            amount: Amount,
        ) -> Result<()> {
            self.outgoing += 1;
            if self.outgoing == self.fail_on {
                return Err(SwapError::TransferFailed {
                    asset,
                    amount,
                    reason: "recipient hook reverted".to_string(),
                });
            }
            self.book.transfer_out(asset, to, amount)
        }

        fn balance_of(&self, asset: AssetHandle, holder: AccountId) -> Amount {
            self.book.balance_of(asset, holder)
        }

        fn allowance(&self, token: TokenId, owner: AccountId) -> Amount {
            self.book.allowance(token, owner)
        }

        fn check_transfer_out(
            &self,
            asset: AssetHandle,
            to: AccountId,
            amount: Amount,
        ) -> Result<()> {
            self.book.check_transfer_out(asset, to, amount)
        }
    }

    struct TwoByTwo {
        swap: SwapAgreement,
        book: FlakyBook,
        quote: AssetHandle,
        now: DateTime<Utc>,
        /// Two native investors, one token investor.
        a: AccountId,
        b: AccountId,
        c: AccountId,
    }

    /// Native base (limit 2), token quote (limit 2); a and b hold one
    /// native unit each, c holds two approved tokens.
    fn two_by_two(fail_on: usize) -> TwoByTwo {
        let now = Utc::now();
        let token = TokenId::random();
        let mut cfg = SwapConfig::dummy(2, 2);
        cfg.quote_asset = AssetHandle::Token(token);
        let mut book = InMemoryAssets::new(AccountId::new());
        let (a, b, c) = (AccountId::new(), AccountId::new(), AccountId::new());
        book.mint(AssetHandle::Native, a, 1);
        book.mint(AssetHandle::Native, b, 1);
        book.mint(AssetHandle::Token(token), c, 2);
        book.approve(token, c, 2);
        TwoByTwo {
            swap: SwapAgreement::new(cfg, now).unwrap(),
            book: FlakyBook {
                book,
                fail_on,
                outgoing: 0,
            },
            quote: AssetHandle::Token(token),
            now,
            a,
            b,
            c,
        }
    }

    impl TwoByTwo {
        fn fill_base(&mut self) {
            for who in [self.a, self.b] {
                let ctx = CallContext::new(who, self.now).with_value(1);
                self.swap.deposit_native(&mut self.book, &ctx).unwrap();
            }
        }

        fn fill_quote(&mut self) -> Result<Vec<SwapEvent>> {
            let ctx = CallContext::new(self.c, self.now);
            self.swap.deposit_token(&mut self.book, &ctx, Side::Quote, 2)
        }

        fn escrow_holds(&self, asset: AssetHandle) -> Amount {
            self.book.balance_of(asset, self.book.escrow_account())
        }
    }

    #[test]
    fn settlement_commits_once_a_payout_has_left_escrow() {
        // Payout order: a (quote), b (quote), c (native). b's is refused.
        let mut t = two_by_two(2);
        t.fill_base();
        let events = t.fill_quote().unwrap();

        assert!(events.contains(&SwapEvent::PayoutDeferred {
            asset: t.quote,
            recipient: t.b,
            amount: 1,
        }));
        assert!(matches!(events.last(), Some(SwapEvent::Swap { .. })));
        assert!(t.swap.is_swapped());
        assert_eq!(
            t.swap.unpaid(),
            &[Payout {
                pool: Side::Quote,
                recipient: t.b,
                amount: 1,
            }]
        );
        assert_eq!(t.book.balance_of(t.quote, t.a), 1);
        assert_eq!(t.book.balance_of(t.quote, t.b), 0);
        assert_eq!(t.book.balance_of(AssetHandle::Native, t.c), 2);
        assert_eq!(t.escrow_holds(t.quote), 1);

        // The paid-out pools cannot be refunded a second time.
        let owner = t.swap.owner();
        let err = t
            .swap
            .cancel(&mut t.book, &CallContext::new(owner, t.now))
            .unwrap_err();
        assert!(matches!(err, SwapError::AlreadyTerminal { .. }));

        let events = t.swap.retry_unpaid(&mut t.book, &CallContext::new(t.c, t.now));
        assert_eq!(
            events,
            vec![SwapEvent::DeferredPayoutSent {
                asset: t.quote,
                recipient: t.b,
                amount: 1,
            }]
        );
        assert!(t.swap.unpaid().is_empty());
        assert_eq!(t.book.balance_of(t.quote, t.b), 1);
        assert_eq!(t.escrow_holds(t.quote), 0);
    }

    #[test]
    fn refused_first_payout_rolls_back_settlement() {
        let mut t = two_by_two(1);
        t.fill_base();
        let err = t.fill_quote().unwrap_err();

        assert!(matches!(err, SwapError::TransferFailed { .. }));
        assert_eq!(t.swap.status(), SwapStatus::Open);
        assert_eq!(t.swap.raised(Side::Quote), 0);
        assert_eq!(t.swap.raised(Side::Base), 2);
        assert!(t.swap.unpaid().is_empty());
        assert!(t.swap.last_settlement().is_none());
        // The pulled tokens went back to c; nobody was paid.
        assert_eq!(t.book.balance_of(t.quote, t.c), 2);
        assert_eq!(t.book.balance_of(t.quote, t.a), 0);
        assert_eq!(t.escrow_holds(AssetHandle::Native), 2);
    }

    #[test]
    fn cancel_defers_refused_refund() {
        let mut t = two_by_two(2);
        t.fill_base();
        let owner = t.swap.owner();
        let events = t
            .swap
            .cancel(&mut t.book, &CallContext::new(owner, t.now))
            .unwrap();

        assert_eq!(
            events,
            vec![
                SwapEvent::PayoutDeferred {
                    asset: AssetHandle::Native,
                    recipient: t.b,
                    amount: 1,
                },
                SwapEvent::Cancel { by: owner },
            ]
        );
        assert!(t.swap.is_cancelled());
        assert_eq!(t.book.balance_of(AssetHandle::Native, t.a), 1);
        assert_eq!(t.escrow_holds(AssetHandle::Native), 1);
        assert_eq!(t.swap.unpaid().len(), 1);

        t.swap.retry_unpaid(&mut t.book, &CallContext::new(t.a, t.now));
        assert_eq!(t.book.balance_of(AssetHandle::Native, t.b), 1);
        assert_eq!(t.swap.events().len(), 5);
    }
}
