//! Domain model: catalog, cart, designs, orders.

pub mod cart;
pub mod design;
pub mod order;
pub mod product;

pub use cart::{Cart, CartDesign, CartItem};
pub use design::{CustomDesign, DesignFile, OrderItemDesign, Rect, ReviewStatus};
pub use order::{
    Address, GatewayRef, ManualProof, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus,
    StatusChange,
};
pub use product::{Category, Product, Variant};
