//! ARN construction for QuickSight objects

pub fn data_source_arn(region: &str, account_id: &str, data_source_id: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:datasource/{}",
        region, account_id, data_source_id
    )
}

pub fn template_arn(region: &str, account_id: &str, template_id: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:template/{}",
        region, account_id, template_id
    )
}

pub fn group_arn(region: &str, account_id: &str, namespace: &str, group_name: &str) -> String {
    format!(
        "arn:aws:quicksight:{}:{}:group/{}/{}",
        region, account_id, namespace, group_name
    )
}
