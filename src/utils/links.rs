//! 链接渲染
//!
//! 售卖页和卖家中心链接都只是 magic code 的纯函数，不依赖任何服务端状态。

use crate::config::LinksConfig;

#[derive(Debug, Clone)]
pub struct LinkRenderer {
    base_url: String,
    selling_path: String,
    portal_path: String,
    join_path: String,
}

impl LinkRenderer {
    pub fn new(config: &LinksConfig) -> Self {
        Self {
            base_url: config.public_base_url.trim_end_matches('/').to_string(),
            selling_path: normalize_path(&config.selling_path),
            portal_path: normalize_path(&config.portal_path),
            join_path: normalize_path(&config.join_path),
        }
    }

    pub fn from_global() -> Self {
        Self::new(&crate::config::get_config().links)
    }

    /// 顾客下单页
    pub fn selling_url(&self, magic_link_code: &str) -> String {
        format!("{}{}/{}", self.base_url, self.selling_path, magic_link_code)
    }

    /// 卖家中心
    pub fn portal_url(&self, magic_link_code: &str) -> String {
        format!("{}{}/{}", self.base_url, self.portal_path, magic_link_code)
    }

    /// 活动的公开报名页
    pub fn join_url(&self, self_register_code: &str) -> String {
        format!("{}{}/{}", self.base_url, self.join_path, self_register_code)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
