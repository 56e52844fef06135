//! Cart pricing
//!
//! Pure arithmetic behind quotes and checkouts: which lines get a spot and
//! how a promo discount spreads over the lines that are charged.

use serde::Serialize;

use camp_core::{Cents, Id};
use camp_models::PromoCode;

/// A cart line after capacity was checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub camp_id: Id,
    pub athlete_id: Id,
    pub price: Cents,
    pub waitlisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PricedLine {
    pub camp_id: Id,
    pub athlete_id: Id,
    pub price_cents: Cents,
    pub discount_cents: Cents,
    pub total_cents: Cents,
    pub waitlisted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartPricing {
    pub lines: Vec<PricedLine>,
    /// Sum of the chargeable lines before discount
    pub subtotal_cents: Cents,
    pub discount_cents: Cents,
    /// Amount to charge now
    pub total_cents: Cents,
}

/// Mark which of `requested` new registrations fit into `free` spots; the
/// earlier lines win
pub fn allocate_spots(free: i64, requested: usize) -> Vec<bool> {
    let free = usize::try_from(free.max(0)).unwrap_or(usize::MAX);
    (0..requested).map(|index| index >= free).collect()
}

/// Price the cart, spreading the promo discount over chargeable lines by
/// price so per-line totals add up to the charged amount exactly
pub fn price_cart(lines: &[CartLine], promo: Option<&PromoCode>) -> CartPricing {
    let chargeable: Vec<&CartLine> = lines.iter().filter(|line| !line.waitlisted).collect();
    let subtotal: Cents = chargeable.iter().map(|line| line.price).sum();

    let discount = promo.map_or(Cents::ZERO, |code| code.discount_for(subtotal));
    let weights: Vec<i64> = chargeable.iter().map(|line| line.price.value()).collect();
    let mut shares = discount.allocate(&weights).into_iter();

    let priced = lines
        .iter()
        .map(|line| {
            let share = if line.waitlisted {
                Cents::ZERO
            } else {
                shares.next().unwrap_or(Cents::ZERO)
            };
            PricedLine {
                camp_id: line.camp_id,
                athlete_id: line.athlete_id,
                price_cents: line.price,
                discount_cents: share,
                total_cents: line.price.saturating_sub(share),
                waitlisted: line.waitlisted,
            }
        })
        .collect();

    CartPricing {
        lines: priced,
        subtotal_cents: subtotal,
        discount_cents: discount,
        total_cents: subtotal - discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camp_models::DiscountKind;
    use chrono::Utc;

    fn line(camp_id: Id, price: i64, waitlisted: bool) -> CartLine {
        CartLine {
            camp_id,
            athlete_id: 1,
            price: Cents(price),
            waitlisted,
        }
    }

    fn promo(kind: DiscountKind, amount: i64) -> PromoCode {
        PromoCode {
            id: 1,
            tenant_id: 1,
            code: "SUMMER".into(),
            kind,
            amount,
            valid_from: None,
            valid_until: None,
            max_redemptions: None,
            redemptions: 0,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_allocate_spots() {
        assert_eq!(allocate_spots(2, 3), vec![false, false, true]);
        assert_eq!(allocate_spots(0, 2), vec![true, true]);
        assert_eq!(allocate_spots(-1, 1), vec![true]);
        assert_eq!(allocate_spots(5, 1), vec![false]);
    }

    #[test]
    fn test_no_promo() {
        let pricing = price_cart(&[line(1, 29_900, false), line(2, 19_900, false)], None);
        assert_eq!(pricing.subtotal_cents, Cents(49_800));
        assert_eq!(pricing.discount_cents, Cents::ZERO);
        assert_eq!(pricing.total_cents, Cents(49_800));
    }

    #[test]
    fn test_percent_discount_sums_exactly() {
        let lines = [
            line(1, 29_900, false),
            line(2, 19_900, false),
            line(3, 9_900, false),
        ];
        let pricing = price_cart(&lines, Some(&promo(DiscountKind::Percent, 1_000)));

        assert_eq!(pricing.discount_cents, Cents(5_970));
        let line_discounts: Cents = pricing.lines.iter().map(|l| l.discount_cents).sum();
        let line_totals: Cents = pricing.lines.iter().map(|l| l.total_cents).sum();
        assert_eq!(line_discounts, pricing.discount_cents);
        assert_eq!(line_totals, pricing.total_cents);
        assert_eq!(pricing.total_cents, Cents(59_700 - 5_970));
    }

    #[test]
    fn test_waitlisted_lines_are_not_discounted_or_charged() {
        let lines = [line(1, 10_000, false), line(2, 20_000, true)];
        let pricing = price_cart(&lines, Some(&promo(DiscountKind::Fixed, 2_500)));

        assert_eq!(pricing.subtotal_cents, Cents(10_000));
        assert_eq!(pricing.total_cents, Cents(7_500));
        assert_eq!(pricing.lines[0].total_cents, Cents(7_500));
        assert_eq!(pricing.lines[1].discount_cents, Cents::ZERO);
        assert_eq!(pricing.lines[1].total_cents, Cents(20_000));
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let pricing = price_cart(
            &[line(1, 1_500, false)],
            Some(&promo(DiscountKind::Fixed, 5_000)),
        );
        assert_eq!(pricing.discount_cents, Cents(1_500));
        assert_eq!(pricing.total_cents, Cents::ZERO);
        assert_eq!(pricing.lines[0].total_cents, Cents::ZERO);
    }

    #[test]
    fn test_all_waitlisted_charges_nothing() {
        let pricing = price_cart(
            &[line(1, 1_500, true)],
            Some(&promo(DiscountKind::Percent, 5_000)),
        );
        assert_eq!(pricing.total_cents, Cents::ZERO);
        assert_eq!(pricing.discount_cents, Cents::ZERO);
    }
}
