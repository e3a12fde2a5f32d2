//! Pure order composition: no I/O, totals computed exactly once.

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::domain::{Order, OrderItem, OrderItemDesign, OrderStatus, PaymentMethod, PaymentStatus};
use crate::domain::Cart;

use super::{CheckoutInput, PromoDiscount};

/// Pricing knobs that are policy rather than data. Shipping is currently a
/// free-shipping policy (zero), carried as a value so it can be externalized
/// without touching order logic.
#[derive(Clone, Copy, Debug, Default)]
pub struct PricingPolicy {
    pub shipping_fee: i64,
}

/// `PW-<year>-<5-digit suffix>`. No uniqueness check here; the commit
/// sequencer re-rolls on a rare collision.
pub fn order_number(year: i32) -> String {
    format!("PW-{year}-{:05}", rand::random::<u32>() % 100_000)
}

/// Subtotal over the cart's price snapshots, never from live products.
pub fn subtotal(cart: &Cart) -> i64 {
    cart.items
        .iter()
        .map(|i| (i.unit_price + i.customization_fee) * i64::from(i.quantity))
        .sum()
}

/// Builds the immutable order document from validated inputs. `designs` is
/// the materializer's output, aligned with `cart.items`.
pub fn assemble_order(
    id: Uuid,
    user_id: Uuid,
    cart: &Cart,
    designs: Vec<Option<OrderItemDesign>>,
    input: CheckoutInput,
    policy: &PricingPolicy,
    promo: Option<PromoDiscount>,
) -> Order {
    let now = Utc::now();
    let items: Vec<OrderItem> = cart
        .items
        .iter()
        .zip(designs)
        .map(|(line, design)| OrderItem {
            product_id: line.product_id,
            name: line.name.clone(),
            size: line.size.clone(),
            color: line.color.clone(),
            quantity: line.quantity,
            customized: line.customized,
            design,
            unit_price: line.unit_price,
            customization_fee: line.customization_fee,
            item_total: (line.unit_price + line.customization_fee) * i64::from(line.quantity),
        })
        .collect();

    let subtotal: i64 = items.iter().map(|i| i.item_total).sum();
    let shipping = policy.shipping_fee;
    let discount = promo.as_ref().map_or(0, |p| p.amount);

    // Gateway payments were verified by the external gateway before this
    // call; everything else is collected later.
    let payment_status = match input.payment_method {
        PaymentMethod::Gateway => PaymentStatus::Paid,
        PaymentMethod::CashOnDelivery | PaymentMethod::ManualUpi | PaymentMethod::ManualQr => {
            PaymentStatus::Pending
        }
    };

    Order {
        id,
        order_number: order_number(now.year()),
        user_id,
        items,
        shipping_address: input.shipping_address,
        payment_method: input.payment_method,
        payment_status,
        gateway_ref: input.gateway_ref,
        manual_proof: input.manual_proof,
        status: OrderStatus::Confirmed,
        subtotal,
        shipping,
        discount,
        promo_code: promo.map(|p| p.code),
        total: subtotal + shipping - discount,
        created_at: now,
        updated_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, CartItem};

    fn address() -> Address {
        Address {
            name: "A Customer".into(),
            phone: "9999999999".into(),
            line1: "1 Main St".into(),
            line2: None,
            city: "Pune".into(),
            state: "MH".into(),
            postal_code: "411001".into(),
            country: "IN".into(),
        }
    }

    fn input(method: PaymentMethod) -> CheckoutInput {
        CheckoutInput {
            shipping_address: address(),
            payment_method: method,
            gateway_ref: None,
            manual_proof: None,
            promo_code: None,
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(CartItem {
            product_id: Uuid::new_v4(),
            name: "Classic Tee".into(),
            size: "M".into(),
            color: "Red".into(),
            quantity: 2,
            customized: false,
            design: None,
            unit_price: 500,
            customization_fee: 0,
        });
        cart.add_item(CartItem {
            product_id: Uuid::new_v4(),
            name: "Hoodie".into(),
            size: "L".into(),
            color: "Black".into(),
            quantity: 1,
            customized: true,
            design: None,
            unit_price: 1200,
            customization_fee: 150,
        });
        cart
    }

    #[test]
    fn order_number_format() {
        let n = order_number(2026);
        assert!(n.starts_with("PW-2026-"));
        let suffix = n.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 5);
        assert!(suffix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn totals_hold_the_invariant() {
        let cart = cart();
        let designs = vec![None, None];
        let order = assemble_order(
            Uuid::now_v7(),
            Uuid::new_v4(),
            &cart,
            designs,
            input(PaymentMethod::CashOnDelivery),
            &PricingPolicy::default(),
            Some(PromoDiscount {
                code: "WELCOME".into(),
                amount: 100,
            }),
        );
        assert_eq!(order.subtotal, 2 * 500 + (1200 + 150));
        assert_eq!(order.total, order.subtotal + order.shipping - order.discount);
        for item in &order.items {
            assert_eq!(
                item.item_total,
                (item.unit_price + item.customization_fee) * i64::from(item.quantity)
            );
        }
    }

    #[test]
    fn payment_status_follows_method() {
        let cart = cart();
        let paid = assemble_order(
            Uuid::now_v7(),
            Uuid::new_v4(),
            &cart,
            vec![None, None],
            input(PaymentMethod::Gateway),
            &PricingPolicy::default(),
            None,
        );
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        let pending = assemble_order(
            Uuid::now_v7(),
            Uuid::new_v4(),
            &cart,
            vec![None, None],
            input(PaymentMethod::ManualUpi),
            &PricingPolicy::default(),
            None,
        );
        assert_eq!(pending.payment_status, PaymentStatus::Pending);
        assert_eq!(pending.status, OrderStatus::Confirmed);
    }

    #[test]
    fn zero_fee_lines_stay_zero() {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(CartItem {
            product_id: Uuid::new_v4(),
            name: "Poster".into(),
            size: "A2".into(),
            color: "White".into(),
            quantity: 3,
            customized: false,
            design: None,
            unit_price: 250,
            customization_fee: 0,
        });
        let order = assemble_order(
            Uuid::now_v7(),
            Uuid::new_v4(),
            &cart,
            vec![None],
            input(PaymentMethod::CashOnDelivery),
            &PricingPolicy::default(),
            None,
        );
        assert_eq!(order.items[0].customization_fee, 0);
        assert_eq!(order.items[0].item_total, 750);
    }
}
