/// A macro wrapping the check-compute-store pattern for catalog lookups.
///
/// Checks the cache for the key and returns the hit when one is live.
/// Otherwise the block computes the value, which is stored under the key
/// before being returned.
///
/// # Arguments
/// * `$cache`: a [`crate::db::CatalogCache`]
/// * `$key`: the [`crate::db::CacheKey`] identifying this call signature
/// * `$block`: the async block computing the value on a miss
///
/// # Example
/// ```rust,ignore
/// let entries = cached!(self.cache, key, async move {
///     self.fetch_from_api().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        if let Some(hit) = $cache.get(&$key).await {
            Ok(hit)
        } else {
            let value = $block.await?;
            $cache.insert(&$key, &value).await;
            Ok(value)
        }
    }};
}
