//! Best-fit image and provider icon selection.

use crate::asset::{EmbeddedAsset, Image};

/// Picks the image closest to `size`, favouring the smallest one at or above
/// it and otherwise the largest one below it.
///
/// Candidates are visited left to right; the first one seeds the selection.
/// Returns `None` for an empty list.
#[must_use]
pub fn select_image_to_size(images: &[Image], size: u32) -> Option<&Image> {
    select_from(images.iter(), size)
}

/// Display image for the asset: only `https` images are eligible.
#[must_use]
pub fn display_image_to_size(asset: &EmbeddedAsset, size: u32) -> Option<&Image> {
    select_from(asset.images().iter().filter(|i| is_https(&i.url)), size)
}

/// Provider icon for the asset, chosen from the unfiltered icon list.
#[must_use]
pub fn provider_icon_to_size(asset: &EmbeddedAsset, size: u32) -> Option<&Image> {
    select_image_to_size(asset.provider_icons(), size)
}

/// Minimum-size policy applied to provider images before they enter a model.
///
/// A dimension of 0 is unmeasured and never fails the check, so an image
/// whose size is unknown is kept.
#[must_use]
pub fn is_large_enough(image: &Image, min_size: u32) -> bool {
    let fits = |edge: u32| edge == 0 || edge >= min_size;
    fits(image.width) && fits(image.height)
}

fn select_from<'a>(images: impl Iterator<Item = &'a Image>, size: u32) -> Option<&'a Image> {
    let mut selected: Option<(&Image, u32)> = None;

    for image in images {
        let image_size = image.effective_size();
        let replace = match selected {
            None => true,
            Some((_, selected_size)) => {
                (selected_size < size && image_size > selected_size)
                    || (selected_size > image_size && image_size > size)
            }
        };
        if replace {
            selected = Some((image, image_size));
        }
    }

    selected.map(|(image, _)| image)
}

/// True when the URL's scheme is exactly `https`.
fn is_https(url: &str) -> bool {
    url.split_once(':').is_some_and(|(scheme, _)| scheme == "https")
}
