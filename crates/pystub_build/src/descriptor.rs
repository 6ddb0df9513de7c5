//! JVM field descriptor decoding for stub type annotations.

/// Decodes a field descriptor into a readable type name.
///
/// `owner` is the dotted name of the class the descriptor appears in. A
/// reference to a class nested directly in `owner` collapses to its simple
/// name; other references keep the full dotted path. Unrecognised input is
/// returned unchanged.
pub fn readable_type(descriptor: &str, owner: &str) -> String {
    if let Some(element) = descriptor.strip_prefix('[') {
        return format!("{}[]", readable_type(element, owner));
    }

    if let Some(token) = primitive_token(descriptor) {
        return token.to_string();
    }

    if let Some(internal) = reference_name(descriptor) {
        return reference_type(internal, owner);
    }

    descriptor.to_string()
}

/// Field annotation form of [`readable_type`]: the package qualifier is
/// dropped but the nesting chain is kept, so `Lui/Outer$Inner;` becomes
/// `Outer.Inner`, or `Inner` when `owner` is `ui.Outer`.
pub fn annotation_type(descriptor: &str, owner: &str) -> String {
    if let Some(element) = descriptor.strip_prefix('[') {
        return format!("{}[]", annotation_type(element, owner));
    }

    match reference_name(descriptor) {
        Some(internal) => relative_name(internal, owner).unwrap_or_else(|| {
            let simple = internal.rsplit('/').next().unwrap_or(internal);
            simple.replace('$', ".")
        }),
        None => readable_type(descriptor, owner),
    }
}

fn reference_name(descriptor: &str) -> Option<&str> {
    descriptor
        .strip_prefix('L')
        .and_then(|rest| rest.strip_suffix(';'))
}

fn primitive_token(descriptor: &str) -> Option<&'static str> {
    let token = match descriptor {
        "I" => "jint",
        "J" => "jlong",
        "Z" => "jboolean",
        "F" => "jfloat",
        "D" => "jdouble",
        "V" => "jvoid",
        _ => return None,
    };
    Some(token)
}

fn reference_type(internal: &str, owner: &str) -> String {
    relative_name(internal, owner).unwrap_or_else(|| internal.replace(['/', '$'], "."))
}

/// Simple name of `internal` when it is nested directly in `owner`.
fn relative_name(internal: &str, owner: &str) -> Option<String> {
    let (enclosing, inner) = internal.rsplit_once('$')?;
    (enclosing.replace(['/', '$'], ".") == owner).then(|| inner.to_string())
}
