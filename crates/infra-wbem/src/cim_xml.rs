// CIM-XML codec (DSP0200/DSP0201 subset)
// Only what a ping needs: build EnumerateInstances, read back an ERROR or a count.

use wbemping_core::port::RemoteError;

/// Intrinsic method issued by the probe
pub const ENUMERATE_INSTANCES: &str = "EnumerateInstances";

/// Build the request body for `EnumerateInstances`
///
/// Shallow, non-local, without qualifiers or class origin: the cheapest call
/// that still makes the provider return full instances.
pub fn enumerate_instances_request(message_id: u64, namespace: &str, class_name: &str) -> String {
    let namespace_path: String = namespace
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("<NAMESPACE NAME=\"{}\"/>", escape(segment)))
        .collect();

    format!(
        concat!(
            "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n",
            "<CIM CIMVERSION=\"2.0\" DTDVERSION=\"2.0\">",
            "<MESSAGE ID=\"{id}\" PROTOCOLVERSION=\"1.0\">",
            "<SIMPLEREQ>",
            "<IMETHODCALL NAME=\"{method}\">",
            "<LOCALNAMESPACEPATH>{namespace}</LOCALNAMESPACEPATH>",
            "<IPARAMVALUE NAME=\"ClassName\"><CLASSNAME NAME=\"{class}\"/></IPARAMVALUE>",
            "<IPARAMVALUE NAME=\"LocalOnly\"><VALUE>FALSE</VALUE></IPARAMVALUE>",
            "<IPARAMVALUE NAME=\"DeepInheritance\"><VALUE>FALSE</VALUE></IPARAMVALUE>",
            "<IPARAMVALUE NAME=\"IncludeQualifiers\"><VALUE>FALSE</VALUE></IPARAMVALUE>",
            "<IPARAMVALUE NAME=\"IncludeClassOrigin\"><VALUE>FALSE</VALUE></IPARAMVALUE>",
            "</IMETHODCALL>",
            "</SIMPLEREQ>",
            "</MESSAGE>",
            "</CIM>"
        ),
        id = message_id,
        method = ENUMERATE_INSTANCES,
        namespace = namespace_path,
        class = escape(class_name),
    )
}

/// Interpret an `EnumerateInstances` response body
///
/// Returns the number of `VALUE.NAMEDINSTANCE` elements.
///
/// # Errors
/// - RemoteError::Cim if the body carries an `ERROR` element
/// - RemoteError::Protocol if the body is not a method response
pub fn parse_enumerate_response(body: &str) -> Result<usize, RemoteError> {
    if let Some(start) = body.find("<ERROR") {
        let tag = element_tag(&body[start..]);
        let code = attribute(tag, "CODE")
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .ok_or_else(|| {
                RemoteError::Protocol("ERROR element without a numeric CODE".to_string())
            })?;
        let description = attribute(tag, "DESCRIPTION")
            .map(unescape)
            .unwrap_or_default();
        return Err(RemoteError::Cim { code, description });
    }

    if !body.contains("<IRETURNVALUE") {
        return Err(RemoteError::Protocol(
            "malformed CIM-XML response: no IRETURNVALUE".to_string(),
        ));
    }

    Ok(body.matches("<VALUE.NAMEDINSTANCE").count())
}

/// The opening tag starting at `fragment` (up to and including '>')
fn element_tag(fragment: &str) -> &str {
    match fragment.find('>') {
        Some(end) => &fragment[..=end],
        None => fragment,
    }
}

/// Value of a double-quoted attribute inside one tag
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let mut search_from = 0;

    while let Some(rel) = tag[search_from..].find(&needle) {
        let start = search_from + rel;
        let value_start = start + needle.len();
        let whole_name = tag[..start].ends_with(char::is_whitespace);
        if whole_name {
            let len = tag[value_start..].find('"')?;
            return Some(&tag[value_start..value_start + len]);
        }
        search_from = value_start;
    }
    None
}

fn escape(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn unescape(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
