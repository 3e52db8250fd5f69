//! Assembly of the final NRQL statement.

/// Only a single scalar is ever read back.
pub const LIMIT_CLAUSE: &str = " limit 1";

/// Builds the executable query from a metric's template.
///
/// The cluster condition and the selector fragment each get their own
/// `where` keyword, so a query carrying both reads
/// `... where clusterName='c' where key IS NOT NULL limit 1`.
/// Nothing besides these clauses and the limit is added; ordering, grouping
/// and time ranges belong in the template.
pub fn assemble(
    template: &str,
    cluster_name: &str,
    add_cluster_filter: bool,
    filter_fragment: &str,
) -> String {
    let mut query = String::from(template);

    if add_cluster_filter {
        query.push_str(&format!(" where clusterName='{cluster_name}'"));
    }

    if !filter_fragment.is_empty() {
        query.push_str(" where ");
        query.push_str(filter_fragment);
    }

    query.push_str(LIMIT_CLAUSE);
    query
}
