use crate::models::{Orientation, Profile};

/// Whether `viewer` would be interested in `target`.
///
/// Fails closed: a viewer without gender or orientation, a target without
/// gender, or an unrecognized orientation is never attracted.
pub fn is_attracted(viewer: &Profile, target: &Profile) -> bool {
    let (Some(viewer_gender), Some(orientation)) = (&viewer.gender, viewer.orientation) else {
        return false;
    };
    let Some(target_gender) = &target.gender else {
        return false;
    };

    // Hand-built profiles may skip normalization.
    let same_gender = viewer_gender.eq_ignore_ascii_case(target_gender);

    match orientation {
        Orientation::Straight => !same_gender,
        Orientation::Gay | Orientation::Lesbian => same_gender,
        Orientation::Bisexual => true,
        Orientation::Unrecognized => false,
    }
}

/// A pair is only scored when attraction holds in both directions.
pub fn mutually_attracted(a: &Profile, b: &Profile) -> bool {
    is_attracted(a, b) && is_attracted(b, a)
}
