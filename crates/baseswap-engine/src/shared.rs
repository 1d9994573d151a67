//! Thread-safe handle for multi-threaded hosts.
//!
//! One mutex per agreement serializes every call, so each operation runs
//! to completion (including settlement or refund disbursement) before the
//! next starts. Distinct agreements never contend.

use std::sync::{Arc, Mutex, MutexGuard};

use baseswap_types::{Amount, Result, Side, SwapError, SwapEvent};

use crate::adapter::AssetAdapter;
use crate::agreement::SwapAgreement;
use crate::context::CallContext;

struct Inner<A> {
    agreement: SwapAgreement,
    adapter: A,
}

/// Cloneable, lock-guarded agreement plus its adapter.
pub struct SharedAgreement<A> {
    inner: Arc<Mutex<Inner<A>>>,
}

impl<A> Clone for SharedAgreement<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AssetAdapter> SharedAgreement<A> {
    #[must_use]
    pub fn new(agreement: SwapAgreement, adapter: A) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { agreement, adapter })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner<A>>> {
        self.inner
            .lock()
            .map_err(|_| SwapError::Internal("agreement lock poisoned".to_string()))
    }

    pub fn deposit_native(&self, ctx: &CallContext) -> Result<Vec<SwapEvent>> {
        let mut guard = self.lock()?;
        let Inner { agreement, adapter } = &mut *guard;
        agreement.deposit_native(adapter, ctx)
    }

    pub fn deposit_token(
        &self,
        ctx: &CallContext,
        side: Side,
        amount: Amount,
    ) -> Result<Vec<SwapEvent>> {
        let mut guard = self.lock()?;
        let Inner { agreement, adapter } = &mut *guard;
        agreement.deposit_token(adapter, ctx, side, amount)
    }

    pub fn deposit_token_allowance(&self, ctx: &CallContext, side: Side) -> Result<Vec<SwapEvent>> {
        let mut guard = self.lock()?;
        let Inner { agreement, adapter } = &mut *guard;
        agreement.deposit_token_allowance(adapter, ctx, side)
    }

    pub fn cancel(&self, ctx: &CallContext) -> Result<Vec<SwapEvent>> {
        let mut guard = self.lock()?;
        let Inner { agreement, adapter } = &mut *guard;
        agreement.cancel(adapter, ctx)
    }

    pub fn refund(&self, ctx: &CallContext, side: Side) -> Result<Vec<SwapEvent>> {
        let mut guard = self.lock()?;
        let Inner { agreement, adapter } = &mut *guard;
        agreement.refund(adapter, ctx, side)
    }

    pub fn retry_unpaid(&self, ctx: &CallContext) -> Result<Vec<SwapEvent>> {
        let mut guard = self.lock()?;
        let Inner { agreement, adapter } = &mut *guard;
        Ok(agreement.retry_unpaid(adapter, ctx))
    }

    /// Read under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&SwapAgreement, &A) -> R) -> Result<R> {
        let guard = self.lock()?;
        Ok(f(&guard.agreement, &guard.adapter))
    }

    /// Mutate the adapter under the lock (funding accounts, approvals).
    pub fn with_adapter<R>(&self, f: impl FnOnce(&mut A) -> R) -> Result<R> {
        let mut guard = self.lock()?;
        Ok(f(&mut guard.adapter))
    }
}
