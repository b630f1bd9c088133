//! Scenario: cancellation locks once production starts.
//!
//! # Invariant under test
//!
//! Cancelling from `Printing`, `Done` or `Delivered` fails with a conflict and
//! leaves the order byte-for-byte unchanged. Cancelling from any other status
//! lands in `Cancelled`. Admin edits stay possible on cancelled orders.

use printshop_orders::{repository, AdminEdit, OrderEvent, OrderLifecycle};
use printshop_schemas::{Document, Money, Order, OrderStatus};

fn doc_with(status: OrderStatus) -> Document {
    let mut doc = Document::empty();
    let mut order = Order::new("C0FFEE00", "http://example/model1", "Red", "Standard");
    order.status = status;
    order.print_price = Money::from_units(12);
    repository::append(&mut doc, order);
    doc
}

#[test]
fn cancel_on_locked_order_leaves_it_untouched() {
    for status in [OrderStatus::Printing, OrderStatus::Done, OrderStatus::Delivered] {
        let mut doc = doc_with(status);
        let before = doc.clone();

        let err = repository::update_where(&mut doc, "C0FFEE00", |o| {
            Ok(o.apply(OrderEvent::Cancel)?)
        })
        .unwrap_err();

        assert_eq!(err.kind(), "conflict", "status {status}");
        assert_eq!(doc, before, "failed cancel must not mutate the document");
    }
}

#[test]
fn cancel_on_open_order_succeeds() {
    for status in [
        OrderStatus::PendingQuote,
        OrderStatus::WaitingForApproval,
        OrderStatus::Approved,
        OrderStatus::PriceDenied,
    ] {
        let mut doc = doc_with(status);
        let t = repository::update_where(&mut doc, "C0FFEE00", |o| {
            Ok(o.apply(OrderEvent::Cancel)?)
        })
        .unwrap();
        assert_eq!(t.from, status);
        assert_eq!(doc.orders[0].status, OrderStatus::Cancelled);
    }
}

#[test]
fn admin_can_still_edit_fields_of_terminal_orders() {
    let mut doc = doc_with(OrderStatus::Cancelled);
    repository::update_where(&mut doc, "C0FFEE00", |o| {
        Ok(o.apply_admin_edit(AdminEdit {
            material_fee: Some(Money::from_units(2)),
            ..AdminEdit::default()
        }))
    })
    .unwrap();
    let o = &doc.orders[0];
    assert_eq!(o.status, OrderStatus::Cancelled);
    assert_eq!(o.material_fee, Money::from_units(2));
    assert_eq!(o.print_price, Money::from_units(12));
}
