//! Design materialization: turns each cart line's ephemeral client payload
//! into stored blobs plus `CustomDesign` rows, producing the normalized
//! order-line design shape.
//!
//! Failures are collected across all lines and views; if any remain at the
//! end the whole order is aborted, because partially-missing artwork cannot
//! be fulfilled. Blobs uploaded earlier in the failed attempt are deleted
//! best-effort before the error is returned.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::User;
use crate::domain::cart::{AreaPayload, CartDesign, ViewPayload};
use crate::domain::design::MaterializedView;
use crate::domain::{Cart, CustomDesign, DesignFile, OrderItemDesign, Rect, ReviewStatus};
use crate::error::ApiError;
use crate::objectstore::ObjectStore;
use crate::store::DesignStore;

/// Materializes every line of the cart, returning one design slot per line
/// (aligned with `cart.items`). Not idempotent: each run uploads fresh
/// blobs, so the pipeline calls this exactly once per checkout attempt.
pub async fn materialize_designs(
    blobs: &dyn ObjectStore,
    designs: &dyn DesignStore,
    user: &User,
    order_id: Uuid,
    cart: &Cart,
) -> Result<Vec<Option<OrderItemDesign>>, ApiError> {
    let mut attempt = Attempt::default();
    let mut out = Vec::with_capacity(cart.items.len());

    for (line_no, item) in cart.items.iter().enumerate() {
        let design = match &item.design {
            None => None,
            Some(CartDesign::Saved(saved)) => {
                match designs.design(saved.design_id).await {
                    Ok(Some(existing)) => Some(OrderItemDesign::Saved {
                        design_id: existing.id,
                        url: existing.url,
                    }),
                    Ok(None) => {
                        attempt.fail(line_no, format!("saved design {} not found", saved.design_id));
                        None
                    }
                    Err(e) => {
                        attempt.fail(line_no, format!("saved design lookup failed: {e}"));
                        None
                    }
                }
            }
            Some(CartDesign::Views(payload)) => {
                let ctx = LineCtx {
                    user,
                    order_id,
                    product_id: item.product_id,
                    line_no,
                };
                Some(materialize_views(blobs, designs, &ctx, payload, &mut attempt).await)
            }
            Some(CartDesign::Areas(payload)) => {
                let ctx = LineCtx {
                    user,
                    order_id,
                    product_id: item.product_id,
                    line_no,
                };
                Some(materialize_areas(blobs, designs, &ctx, payload, &mut attempt).await)
            }
        };
        out.push(design);
    }

    if !attempt.failures.is_empty() {
        attempt.cleanup(blobs, designs, order_id).await;
        return Err(ApiError::AssetMaterializationFailed {
            failures: attempt.failures,
        });
    }
    Ok(out)
}

/// Tracks this attempt's uploads and failures so a failed attempt can be
/// unwound.
#[derive(Default)]
struct Attempt {
    uploaded: Vec<String>,
    failures: Vec<String>,
}

impl Attempt {
    fn fail(&mut self, line_no: usize, message: String) {
        self.failures.push(format!("line {line_no}: {message}"));
    }

    async fn cleanup(&self, blobs: &dyn ObjectStore, designs: &dyn DesignStore, order_id: Uuid) {
        for url in &self.uploaded {
            if let Err(e) = blobs.delete(url).await {
                tracing::warn!(url, error = %e, "orphaned blob left by failed materialization");
            }
        }
        if let Err(e) = designs.delete_designs_for_order(order_id).await {
            tracing::warn!(%order_id, error = %e, "failed to remove design rows of aborted order");
        }
    }
}

/// Per-line context threaded through the per-shape materializers.
struct LineCtx<'a> {
    user: &'a User,
    order_id: Uuid,
    product_id: Uuid,
    line_no: usize,
}

async fn materialize_views(
    blobs: &dyn ObjectStore,
    designs: &dyn DesignStore,
    ctx: &LineCtx<'_>,
    payload: &ViewPayload,
    attempt: &mut Attempt,
) -> OrderItemDesign {
    let expected = payload.views.len();
    let mut views = Vec::with_capacity(expected);
    let mut skipped = 0usize;

    for placement in &payload.views {
        // A dangling library reference skips the view; the skip is counted
        // once at the end so the line still fails. Views that fail with an
        // explicit error record that error instead.
        let Some(image) = payload.library.iter().find(|i| i.id == placement.image_id) else {
            tracing::warn!(
                line_no = ctx.line_no,
                view = placement.view,
                image_id = %placement.image_id,
                "design view references missing library entry"
            );
            skipped += 1;
            continue;
        };

        let (bytes, mime) = match decode_inline(&image.data, image.mime.as_deref()) {
            Ok(decoded) => decoded,
            Err(e) => {
                attempt.fail(ctx.line_no, format!("view {}: {e}", placement.view));
                continue;
            }
        };
        let path = format!(
            "designs/{}/{}/view-{}.{}",
            ctx.user.id,
            ctx.order_id,
            placement.view,
            ext_for_mime(&mime)
        );
        let url = match blobs.put(&path, bytes.clone()).await {
            Ok(url) => url,
            Err(e) => {
                attempt.fail(ctx.line_no, format!("view {}: upload failed: {e}", placement.view));
                continue;
            }
        };
        attempt.uploaded.push(url.clone());

        let preview_url =
            upload_preview(blobs, ctx, placement.view, placement.preview.as_deref(), attempt).await;

        let design = new_design(
            ctx,
            url.clone(),
            DesignFile {
                name: image
                    .name
                    .clone()
                    .unwrap_or_else(|| format!("view-{}", placement.view)),
                mime,
                size: bytes.len() as u64,
                width: None,
                height: None,
            },
            Some(placement.position),
            format!("view-{}", placement.view),
        );
        match designs.insert_design(&design).await {
            Ok(()) => views.push(MaterializedView {
                view: placement.view,
                design_id: design.id,
                url,
                position: placement.position,
                preview_url,
            }),
            Err(e) => {
                attempt.fail(ctx.line_no, format!("view {}: persist failed: {e}", placement.view))
            }
        }
    }

    if skipped > 0 {
        attempt.fail(
            ctx.line_no,
            format!("{skipped}/{expected} views reference a missing library image"),
        );
    }
    OrderItemDesign::Views { views }
}

/// The positioned-preview composite is decorative; its failure is logged,
/// never fatal.
async fn upload_preview(
    blobs: &dyn ObjectStore,
    ctx: &LineCtx<'_>,
    view: u32,
    preview: Option<&str>,
    attempt: &mut Attempt,
) -> Option<String> {
    let data = preview?;
    let (bytes, mime) = match decode_inline(data, None) {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!(view, error = %e, "preview decode failed");
            return None;
        }
    };
    let path = format!(
        "designs/{}/{}/view-{}-preview.{}",
        ctx.user.id,
        ctx.order_id,
        view,
        ext_for_mime(&mime)
    );
    match blobs.put(&path, bytes).await {
        Ok(url) => {
            attempt.uploaded.push(url.clone());
            Some(url)
        }
        Err(e) => {
            tracing::warn!(view, error = %e, "preview upload failed");
            None
        }
    }
}

async fn materialize_areas(
    blobs: &dyn ObjectStore,
    designs: &dyn DesignStore,
    ctx: &LineCtx<'_>,
    payload: &AreaPayload,
    attempt: &mut Attempt,
) -> OrderItemDesign {
    let slots = [
        ("front", &payload.front),
        ("back", &payload.back),
        ("wraparound", &payload.wraparound),
        ("preview", &payload.preview),
    ];
    let mut resolved: [Option<String>; 4] = Default::default();

    for (i, (slot, value)) in slots.into_iter().enumerate() {
        let Some(value) = value else { continue };
        // Already a stored URL: pass through, nothing to upload.
        if !value.starts_with("data:") {
            resolved[i] = Some(value.clone());
            continue;
        }
        let (bytes, mime) = match decode_inline(value, None) {
            Ok(decoded) => decoded,
            Err(e) => {
                attempt.fail(ctx.line_no, format!("{slot}: {e}"));
                continue;
            }
        };
        let path = format!(
            "designs/{}/{}/{}.{}",
            ctx.user.id,
            ctx.order_id,
            slot,
            ext_for_mime(&mime)
        );
        match blobs.put(&path, bytes.clone()).await {
            Ok(url) => {
                attempt.uploaded.push(url.clone());
                let design = new_design(
                    ctx,
                    url.clone(),
                    DesignFile {
                        name: slot.to_string(),
                        mime,
                        size: bytes.len() as u64,
                        width: None,
                        height: None,
                    },
                    None,
                    slot.to_string(),
                );
                if let Err(e) = designs.insert_design(&design).await {
                    attempt.fail(ctx.line_no, format!("{slot}: persist failed: {e}"));
                } else {
                    resolved[i] = Some(url);
                }
            }
            Err(e) => attempt.fail(ctx.line_no, format!("{slot}: upload failed: {e}")),
        }
    }

    let [front, back, wraparound, preview] = resolved;
    OrderItemDesign::Areas {
        front,
        back,
        wraparound,
        preview,
    }
}

fn new_design(
    ctx: &LineCtx<'_>,
    url: String,
    file: DesignFile,
    position: Option<Rect>,
    design_type: String,
) -> CustomDesign {
    let now = Utc::now();
    CustomDesign {
        id: Uuid::now_v7(),
        user_id: ctx.user.id,
        product_id: ctx.product_id,
        url,
        file,
        print_area: None,
        position,
        design_type,
        order_id: Some(ctx.order_id),
        saved_to_library: false,
        status: ReviewStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

/// Decodes an inline payload: either a `data:<mime>;base64,<body>` URL or
/// bare base64.
fn decode_inline(data: &str, declared_mime: Option<&str>) -> Result<(Vec<u8>, String), String> {
    let (mime, body) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, body) = rest
                .split_once(',')
                .ok_or_else(|| "malformed data URL".to_string())?;
            let mime = header
                .split(';')
                .next()
                .filter(|m| !m.is_empty())
                .unwrap_or("image/png");
            (mime.to_string(), body)
        }
        None => (
            declared_mime.unwrap_or("image/png").to_string(),
            data,
        ),
    };
    let bytes = BASE64
        .decode(body.trim())
        .map_err(|e| format!("base64 decode failed: {e}"))?;
    if bytes.is_empty() {
        return Err("empty image payload".to_string());
    }
    Ok((bytes, mime))
}

fn ext_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cart::{LibraryImage, ViewPlacement};
    use crate::domain::CartItem;
    use crate::objectstore::MemoryObjectStore;
    use crate::store::memory::MemoryStore;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "t@example.com".into(),
            is_admin: false,
        }
    }

    fn rect() -> Rect {
        Rect {
            x: 10.0,
            y: 10.0,
            width: 40.0,
            height: 40.0,
            rotation: 0.0,
        }
    }

    fn customized_line(design: CartDesign) -> CartItem {
        CartItem {
            product_id: Uuid::new_v4(),
            name: "Classic Tee".into(),
            size: "M".into(),
            color: "Red".into(),
            quantity: 1,
            customized: true,
            design: Some(design),
            unit_price: 500,
            customization_fee: 100,
        }
    }

    fn cart_with(design: CartDesign) -> Cart {
        let mut cart = Cart::new(Uuid::new_v4());
        cart.add_item(customized_line(design));
        cart
    }

    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    #[tokio::test]
    async fn view_payload_uploads_and_persists() {
        let blobs = MemoryObjectStore::default();
        let store = MemoryStore::new();
        let cart = cart_with(CartDesign::Views(ViewPayload {
            library: vec![LibraryImage {
                id: "img-1".into(),
                data: PIXEL.into(),
                name: Some("logo.png".into()),
                mime: Some("image/png".into()),
            }],
            views: vec![ViewPlacement {
                view: 0,
                image_id: "img-1".into(),
                position: rect(),
                preview: None,
            }],
        }));
        let order_id = Uuid::now_v7();
        let out = materialize_designs(&blobs, &store, &user(), order_id, &cart)
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        match out[0].as_ref().unwrap() {
            OrderItemDesign::Views { views } => {
                assert_eq!(views.len(), 1);
                assert!(blobs.contains(&views[0].url).await);
            }
            other => panic!("unexpected shape: {other:?}"),
        }
        assert_eq!(store.design_count().await, 1);
    }

    #[tokio::test]
    async fn dangling_library_reference_aborts_and_cleans_up() {
        let blobs = MemoryObjectStore::default();
        let store = MemoryStore::new();
        let cart = cart_with(CartDesign::Views(ViewPayload {
            library: vec![LibraryImage {
                id: "img-1".into(),
                data: PIXEL.into(),
                name: None,
                mime: None,
            }],
            views: vec![
                ViewPlacement {
                    view: 0,
                    image_id: "img-1".into(),
                    position: rect(),
                    preview: None,
                },
                ViewPlacement {
                    view: 1,
                    image_id: "missing".into(),
                    position: rect(),
                    preview: None,
                },
            ],
        }));
        let err = materialize_designs(&blobs, &store, &user(), Uuid::now_v7(), &cart)
            .await
            .unwrap_err();
        match err {
            ApiError::AssetMaterializationFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("1/2"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The view that did upload was unwound with the attempt.
        assert_eq!(blobs.len().await, 0);
        assert_eq!(store.design_count().await, 0);
    }

    // An explicit per-view error must not also be counted as a silent skip.
    #[tokio::test]
    async fn view_decode_failure_is_reported_once() {
        let blobs = MemoryObjectStore::default();
        let store = MemoryStore::new();
        let cart = cart_with(CartDesign::Views(ViewPayload {
            library: vec![LibraryImage {
                id: "img-1".into(),
                data: "!!not-base64!!".into(),
                name: None,
                mime: None,
            }],
            views: vec![ViewPlacement {
                view: 0,
                image_id: "img-1".into(),
                position: rect(),
                preview: None,
            }],
        }));
        let err = materialize_designs(&blobs, &store, &user(), Uuid::now_v7(), &cart)
            .await
            .unwrap_err();
        match err {
            ApiError::AssetMaterializationFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("view 0"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn legacy_url_slots_pass_through_without_upload() {
        let blobs = MemoryObjectStore::default();
        let store = MemoryStore::new();
        let cart = cart_with(CartDesign::Areas(AreaPayload {
            front: Some("https://cdn.example/front.png".into()),
            ..Default::default()
        }));
        let out = materialize_designs(&blobs, &store, &user(), Uuid::now_v7(), &cart)
            .await
            .unwrap();
        match out[0].as_ref().unwrap() {
            OrderItemDesign::Areas { front, .. } => {
                assert_eq!(front.as_deref(), Some("https://cdn.example/front.png"));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
        assert_eq!(blobs.len().await, 0);
    }

    #[tokio::test]
    async fn legacy_inline_slot_is_uploaded() {
        let blobs = MemoryObjectStore::default();
        let store = MemoryStore::new();
        let cart = cart_with(CartDesign::Areas(AreaPayload {
            back: Some(format!("data:image/png;base64,{PIXEL}")),
            ..Default::default()
        }));
        let out = materialize_designs(&blobs, &store, &user(), Uuid::now_v7(), &cart)
            .await
            .unwrap();
        match out[0].as_ref().unwrap() {
            OrderItemDesign::Areas { back, .. } => assert!(back.is_some()),
            other => panic!("unexpected shape: {other:?}"),
        }
        assert_eq!(blobs.len().await, 1);
        assert_eq!(store.design_count().await, 1);
    }

    #[tokio::test]
    async fn bad_base64_collects_failure() {
        let blobs = MemoryObjectStore::default();
        let store = MemoryStore::new();
        let cart = cart_with(CartDesign::Areas(AreaPayload {
            front: Some("data:image/png;base64,!!not-base64!!".into()),
            ..Default::default()
        }));
        let err = materialize_designs(&blobs, &store, &user(), Uuid::now_v7(), &cart)
            .await
            .unwrap_err();
        match err {
            ApiError::AssetMaterializationFailed { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures[0].contains("front"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_inline_handles_both_shapes() {
        let (bytes, mime) = decode_inline(&format!("data:image/jpeg;base64,{PIXEL}"), None).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(mime, "image/jpeg");
        let (_, mime) = decode_inline(PIXEL, Some("image/webp")).unwrap();
        assert_eq!(mime, "image/webp");
    }
}
