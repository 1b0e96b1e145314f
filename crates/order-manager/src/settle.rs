//! `settle(state)`: the status-derivation rule (§4.2.1). Fill and cancel
//! handlers both call into here once they've accumulated the new amounts;
//! the only difference is what a dust-sized residual becomes.

use {crate::market_cap::MarketCapProvider, domain::order::Price, domain::Order, domain::OrderStatus};

/// `(total, dealt, cancelled, token)` on the order's economic axis (§3
/// "the axis fill/cancel pressure accumulates on").
fn axis_amounts(order: &Order) -> (primitive_types::U256, primitive_types::U256, primitive_types::U256, primitive_types::H160) {
    if order.economic_axis_is_buy() {
        (
            order.amount_b,
            order.dealt_amount_b,
            order.cancelled_amount_b,
            order.token_b,
        )
    } else {
        (
            order.amount_s,
            order.dealt_amount_s,
            order.cancelled_amount_s,
            order.token_s,
        )
    }
}

fn residual(order: &Order) -> primitive_types::U256 {
    let (total, dealt, cancelled, _) = axis_amounts(order);
    total.saturating_sub(dealt).saturating_sub(cancelled)
}

fn has_dealt_or_cancelled(order: &Order) -> bool {
    !order.dealt_amount_s.is_zero()
        || !order.dealt_amount_b.is_zero()
        || !order.cancelled_amount_s.is_zero()
        || !order.cancelled_amount_b.is_zero()
}

/// Fill-driven settle: a dust residual always resolves to FINISHED (§4.2.1,
/// §4.2.2). Terminal orders are the caller's responsibility to skip (I5).
pub async fn settle(order: &mut Order, dust_floor: &Price, market_cap: &dyn MarketCapProvider) {
    let (_, _, _, token) = axis_amounts(order);
    let legal_value = market_cap.legal_currency_value(token, residual(order)).await;
    if legal_value <= *dust_floor {
        order.status = OrderStatus::Finished;
    } else if has_dealt_or_cancelled(order) {
        order.status = OrderStatus::Partial;
    }
}

/// Cancel-driven settle: cancel-driven terminal is CANCEL only if the
/// order is fully cancelled on the economic axis and never filled;
/// otherwise a dust residual still produces FINISHED via the same rule
/// fill uses (§4.2.1).
pub async fn settle_after_cancel(
    order: &mut Order,
    dust_floor: &Price,
    market_cap: &dyn MarketCapProvider,
) {
    let (_, _, _, token) = axis_amounts(order);
    let legal_value = market_cap.legal_currency_value(token, residual(order)).await;
    if legal_value <= *dust_floor {
        let never_filled = order.dealt_amount_s.is_zero() && order.dealt_amount_b.is_zero();
        order.status = if never_filled {
            OrderStatus::Cancel
        } else {
            OrderStatus::Finished
        };
    } else if has_dealt_or_cancelled(order) {
        order.status = OrderStatus::Partial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use {async_trait::async_trait, num::BigInt, num::rational::Ratio, primitive_types::U256};

    struct FixedValue(Price);

    #[async_trait]
    impl MarketCapProvider for FixedValue {
        async fn legal_currency_value(&self, _token: primitive_types::H160, _amount: U256) -> Price {
            self.0.clone()
        }
    }

    fn dust_floor() -> Price {
        Ratio::from_integer(BigInt::from(1))
    }

    fn sample_order() -> Order {
        Order {
            hash: Default::default(),
            owner: Default::default(),
            protocol: Default::default(),
            token_s: Default::default(),
            token_b: Default::default(),
            amount_s: U256::from(1000),
            amount_b: U256::from(1000),
            buy_no_more_than_amount_b: false,
            margin_split_percentage: 0,
            lrc_fee: U256::zero(),
            timestamp: 0,
            ttl: 0,
            salt: 0,
            valid_since: 0,
            valid_until: 0,
            v: 27,
            r: Default::default(),
            s: Default::default(),
            dealt_amount_s: U256::zero(),
            dealt_amount_b: U256::zero(),
            split_amount_s: U256::zero(),
            split_amount_b: U256::zero(),
            cancelled_amount_s: U256::zero(),
            cancelled_amount_b: U256::zero(),
            status: domain::OrderStatus::New,
            updated_block: 0,
            miner_block_mark: 0,
            broadcast_time: 0,
        }
    }

    #[tokio::test]
    async fn dust_residual_after_fill_finishes() {
        let mut order = sample_order();
        order.dealt_amount_s = U256::from(999);
        let provider = FixedValue(Ratio::from_integer(BigInt::from(0)));
        settle(&mut order, &dust_floor(), &provider).await;
        assert_eq!(order.status, domain::OrderStatus::Finished);
    }

    #[tokio::test]
    async fn non_dust_residual_with_dealt_amount_is_partial() {
        let mut order = sample_order();
        order.dealt_amount_s = U256::from(500);
        let provider = FixedValue(Ratio::from_integer(BigInt::from(100)));
        settle(&mut order, &dust_floor(), &provider).await;
        assert_eq!(order.status, domain::OrderStatus::Partial);
    }

    #[tokio::test]
    async fn full_cancel_never_filled_is_cancel() {
        let mut order = sample_order();
        order.cancelled_amount_s = U256::from(1000);
        let provider = FixedValue(Ratio::from_integer(BigInt::from(0)));
        settle_after_cancel(&mut order, &dust_floor(), &provider).await;
        assert_eq!(order.status, domain::OrderStatus::Cancel);
    }

    #[tokio::test]
    async fn dust_cancel_after_partial_fill_is_finished() {
        let mut order = sample_order();
        order.dealt_amount_s = U256::from(500);
        order.cancelled_amount_s = U256::from(500);
        let provider = FixedValue(Ratio::from_integer(BigInt::from(0)));
        settle_after_cancel(&mut order, &dust_floor(), &provider).await;
        assert_eq!(order.status, domain::OrderStatus::Finished);
    }
}
