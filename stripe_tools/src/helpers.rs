use crate::NewIntentParams;

/// Encodes intent parameters the way the gateway's form API expects. Metadata becomes `metadata[key]=value` pairs.
pub fn form_params(params: &NewIntentParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), params.amount.to_string()),
        ("currency".to_string(), params.currency.to_lowercase()),
        ("automatic_payment_methods[enabled]".to_string(), "true".to_string()),
    ];
    form.extend(params.metadata.iter().map(|(k, v)| (format!("metadata[{k}]"), v.clone())));
    form
}
