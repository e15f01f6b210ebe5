//! 类型图
//!
//! 持有全部类型记录、父类型到子类型的索引以及记忆化的后代解析结果。
//! 任何结构性变更之后，完整状态通过缓存端口持久化，构造时再读回。
//! 变更检测基于内容哈希：内容相同但重新生成的文件不会被视为变更。

use crate::fs::normalize_path;
use crate::scanner::PhpDeclarationScanner;
use crate::{LocalFileSystem, MemoryCache};
use di_abstractions::{CacheStore, DeclarationScanner, ScanOptions, SourceFileSystem, TypeRegistry};
use infrastructure_common::{
    Candidate, GraphError, GraphResult, NamingConventions, ScanError, ScanUnit, ScanUnitKind,
    TypeRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 持久化状态的格式版本
const STATE_VERSION: u32 = 1;

/// 缓存键前缀
pub const CACHE_KEY_PREFIX: &str = "autowire.type_graph.";

/// 类型图的可持久化状态
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct GraphState {
    version: u32,
    records: HashMap<String, TypeRecord>,
    /// 父类型键 -> 声明它的子类型键
    parent_index: HashMap<String, BTreeSet<String>>,
    scan_units: Vec<ScanUnit>,
    /// 全部具体后代的记忆化结果（未过滤）
    concrete_memo: HashMap<String, Vec<String>>,
}

/// 类型图选项
#[derive(Debug, Clone)]
pub struct TypeGraphOptions {
    /// 类型图标识，决定缓存键
    pub name: String,
    /// 扫描选项
    pub scan: ScanOptions,
}

impl TypeGraphOptions {
    /// 缓存键
    pub fn cache_key(&self) -> String {
        format!("{CACHE_KEY_PREFIX}{}", self.name)
    }
}

impl Default for TypeGraphOptions {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            scan: ScanOptions::default(),
        }
    }
}

/// 类型图构建器
pub struct TypeGraphBuilder {
    options: TypeGraphOptions,
    file_system: Option<Arc<dyn SourceFileSystem>>,
    cache: Option<Arc<dyn CacheStore>>,
    scanner: Option<Arc<dyn DeclarationScanner>>,
}

impl TypeGraphBuilder {
    fn new() -> Self {
        Self {
            options: TypeGraphOptions::default(),
            file_system: None,
            cache: None,
            scanner: None,
        }
    }

    /// 设置类型图标识
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.options.name = name.into();
        self
    }

    /// 设置扫描选项
    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.options.scan = scan;
        self
    }

    /// 设置源文件扩展名白名单
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let follow_links = self.options.scan.follow_links;
        self.options.scan = ScanOptions::with_extensions(extensions);
        self.options.scan.follow_links = follow_links;
        self
    }

    /// 设置文件系统
    pub fn with_file_system(mut self, file_system: Arc<dyn SourceFileSystem>) -> Self {
        self.file_system = Some(file_system);
        self
    }

    /// 设置缓存
    pub fn with_cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// 设置声明扫描器
    pub fn with_scanner(mut self, scanner: Arc<dyn DeclarationScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// 构建类型图并从缓存恢复状态
    pub fn build(self) -> TypeGraph {
        let file_system = self.file_system.unwrap_or_else(|| {
            Arc::new(LocalFileSystem::new().with_follow_links(self.options.scan.follow_links))
        });
        let mut graph = TypeGraph {
            file_system,
            cache: self.cache.unwrap_or_else(|| Arc::new(MemoryCache::new())),
            scanner: self
                .scanner
                .unwrap_or_else(|| Arc::new(PhpDeclarationScanner::new())),
            options: self.options,
            state: GraphState::default(),
        };
        graph.restore();
        graph
    }
}

/// 扫描一批文件的结果
#[derive(Default)]
struct ScanBatch {
    registered: usize,
    failures: Vec<(PathBuf, ScanError)>,
}

impl ScanBatch {
    fn into_result(self) -> GraphResult<usize> {
        if self.failures.is_empty() {
            Ok(self.registered)
        } else {
            Err(GraphError::ScanFailures {
                registered: self.registered,
                failures: self.failures,
            })
        }
    }
}

fn unreadable(err: GraphError) -> ScanError {
    let message = match err {
        GraphError::FileSystem { message, .. } => message,
        other => other.to_string(),
    };
    ScanError::Unreadable { message }
}

/// 类型图
pub struct TypeGraph {
    options: TypeGraphOptions,
    file_system: Arc<dyn SourceFileSystem>,
    cache: Arc<dyn CacheStore>,
    scanner: Arc<dyn DeclarationScanner>,
    state: GraphState,
}

impl TypeGraph {
    /// 创建类型图构建器
    pub fn builder() -> TypeGraphBuilder {
        TypeGraphBuilder::new()
    }

    /// 选项
    pub fn options(&self) -> &TypeGraphOptions {
        &self.options
    }

    /// 已登记的扫描单元
    pub fn scan_units(&self) -> &[ScanUnit] {
        &self.state.scan_units
    }

    /// 立即把当前状态写入缓存
    pub fn flush(&self) -> GraphResult<()> {
        let bytes = serde_json::to_vec(&self.state)?;
        if self.cache.set(&self.options.cache_key(), &bytes)? {
            Ok(())
        } else {
            Err(GraphError::cache(format!(
                "缓存 {} 拒绝写入 {}",
                self.cache.name(),
                self.options.cache_key()
            )))
        }
    }

    fn persist(&self) {
        if let Err(err) = self.flush() {
            error!("类型图状态持久化失败: {}", err);
        }
    }

    fn restore(&mut self) {
        let key = self.options.cache_key();
        let bytes = match self.cache.get(&key) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.state.version = STATE_VERSION;
                return;
            }
            Err(err) => {
                warn!("读取类型图缓存失败，将从空状态开始: {}", err);
                self.state.version = STATE_VERSION;
                return;
            }
        };

        match serde_json::from_slice::<GraphState>(&bytes) {
            Ok(state) if state.version == STATE_VERSION => {
                info!(
                    "从缓存恢复类型图 {}: {} 条记录, {} 个扫描单元",
                    self.options.name,
                    state.records.len(),
                    state.scan_units.len()
                );
                self.state = state;
            }
            Ok(state) => {
                warn!("类型图缓存版本 {} 与当前版本不符，已忽略", state.version);
                self.state.version = STATE_VERSION;
            }
            Err(err) => {
                warn!("类型图缓存损坏，已忽略: {}", err);
                self.state.version = STATE_VERSION;
            }
        }
    }

    // ---- 记录维护 ----

    fn clear_memos(&mut self) {
        for record in self.state.records.values_mut() {
            record.resolved_descendant = None;
        }
        self.state.concrete_memo.clear();
    }

    /// 插入记录，返回是否为新的或已变更的记录
    fn insert_record(&mut self, record: TypeRecord) -> bool {
        let changed = match self.state.records.get(&record.key) {
            Some(existing) => {
                if existing.source_path != record.source_path {
                    debug!(
                        "类型 {} 被 {} 中的声明覆盖",
                        record.qualified_name,
                        record.source_path.display()
                    );
                }
                existing.source_path != record.source_path
                    || existing.content_hash != record.content_hash
                    || existing.parents != record.parents
                    || existing.instantiable != record.instantiable
            }
            None => true,
        };

        if let Some(previous) = self.state.records.remove(&record.key) {
            for parent in previous.parent_keys() {
                if let Some(children) = self.state.parent_index.get_mut(&parent) {
                    children.remove(&previous.key);
                    if children.is_empty() {
                        self.state.parent_index.remove(&parent);
                    }
                }
            }
        }
        for parent in record.parent_keys() {
            self.state
                .parent_index
                .entry(parent)
                .or_default()
                .insert(record.key.clone());
        }
        self.state.records.insert(record.key.clone(), record);
        changed
    }

    fn register_file(&mut self, path: &Path) -> GraphResult<usize> {
        let text = self.file_system.read_source(path)?;
        let content_hash = self.file_system.content_hash(path)?;
        let declarations = self
            .scanner
            .scan(&text)
            .map_err(|source| GraphError::Scan {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("扫描 {}: {} 个声明", path.display(), declarations.len());

        let mut registered = 0;
        for declaration in &declarations {
            let record = TypeRecord::from_declaration(declaration, path, content_hash.clone());
            if self.insert_record(record) {
                registered += 1;
            }
        }
        Ok(registered)
    }

    /// 逐个扫描文件；单个文件的失败记入批次，不中断其余文件
    fn scan_files(&mut self, files: &[PathBuf], batch: &mut ScanBatch) {
        for file in files {
            match self.register_file(file) {
                Ok(count) => batch.registered += count,
                Err(GraphError::Scan { path, source }) => {
                    warn!("文件扫描失败: {}: {}", path.display(), source);
                    batch.failures.push((path, source));
                }
                Err(err) => {
                    warn!("文件读取失败: {}: {}", file.display(), err);
                    batch.failures.push((file.clone(), unreadable(err)));
                }
            }
        }
    }

    /// 扫描目录；目录本身无法列出时在插入任何记录之前失败
    fn scan_directory(&mut self, dir: &Path, batch: &mut ScanBatch) -> GraphResult<ScanUnit> {
        let files = self
            .file_system
            .list_source_files(dir, &self.options.scan.extensions)?;
        let unit = ScanUnit::directory(dir, self.file_system.child_count(dir)?);
        self.scan_files(&files, batch);
        Ok(unit)
    }

    /// 按给定扫描单元重建记录，已消失的单元被丢弃
    fn rescan_units(&mut self, units: &[ScanUnit], batch: &mut ScanBatch) -> GraphResult<()> {
        for unit in units {
            if !self.file_system.exists(&unit.path) {
                warn!("扫描单元 {} 已不存在，移除", unit.path.display());
                continue;
            }
            match unit.kind {
                ScanUnitKind::Directory => {
                    let refreshed = self.scan_directory(&unit.path, batch)?;
                    self.state.scan_units.push(refreshed);
                }
                ScanUnitKind::File => match self.file_system.content_hash(&unit.path) {
                    Ok(content_hash) => {
                        self.scan_files(std::slice::from_ref(&unit.path), batch);
                        self.state.scan_units.push(ScanUnit::file(&unit.path, content_hash));
                    }
                    Err(err) => {
                        // 保留原单元，文件恢复可读后下次重载会重新扫描
                        warn!("文件读取失败: {}: {}", unit.path.display(), err);
                        batch.failures.push((unit.path.clone(), unreadable(err)));
                        self.state.scan_units.push(unit.clone());
                    }
                },
            }
        }
        Ok(())
    }

    fn covering_unit(&self, path: &Path) -> Option<&ScanUnit> {
        self.state
            .scan_units
            .iter()
            .find(|unit| unit.path != path && unit.covers(path))
    }

    fn unit_index(&self, path: &Path, kind: ScanUnitKind) -> Option<usize> {
        self.state
            .scan_units
            .iter()
            .position(|unit| unit.path == path && unit.kind == kind)
    }

    fn display_name(&self, key: &str) -> String {
        self.state
            .records
            .get(key)
            .map_or_else(|| key.to_string(), |record| record.qualified_name.clone())
    }

    fn children(&self, key: &str) -> Option<&BTreeSet<String>> {
        self.state
            .parent_index
            .get(key)
            .filter(|children| !children.is_empty())
    }

    fn ensure_known(&self, key: &str, name: &str) -> GraphResult<()> {
        if self.state.records.contains_key(key) || self.children(key).is_some() {
            Ok(())
        } else {
            Err(GraphError::unknown(NamingConventions::canonical_name(name)))
        }
    }

    // ---- 后代解析 ----

    /// 深度优先收集叶子键（没有子类型的键），同时检测循环继承
    fn collect_leaves(
        &self,
        key: &str,
        visiting: &mut Vec<String>,
        visited: &mut HashSet<String>,
        leaves: &mut Vec<String>,
    ) -> GraphResult<()> {
        if visiting.iter().any(|entry| entry == key) {
            let chain = visiting
                .iter()
                .map(|entry| self.display_name(entry))
                .chain(std::iter::once(self.display_name(key)))
                .collect::<Vec<_>>()
                .join(" -> ");
            return Err(GraphError::CircularInheritance { chain });
        }
        if !visited.insert(key.to_string()) {
            return Ok(());
        }

        match self.children(key) {
            None => leaves.push(key.to_string()),
            Some(children) => {
                visiting.push(key.to_string());
                for child in children {
                    self.collect_leaves(child, visiting, visited, leaves)?;
                }
                visiting.pop();
            }
        }
        Ok(())
    }

    fn leaves_of(&self, key: &str) -> GraphResult<Vec<String>> {
        let mut leaves = Vec::new();
        self.collect_leaves(key, &mut Vec::new(), &mut HashSet::new(), &mut leaves)?;
        Ok(leaves)
    }

    /// 记录的源文件不存在或内容哈希已变化时返回 `StaleRecord`
    fn ensure_fresh(&self, key: &str) -> GraphResult<()> {
        let Some(record) = self.state.records.get(key) else {
            return Ok(());
        };
        let stale = || GraphError::StaleRecord {
            type_name: record.qualified_name.clone(),
            path: record.source_path.clone(),
        };
        if !self.file_system.exists(&record.source_path) {
            return Err(stale());
        }
        match self.file_system.content_hash(&record.source_path) {
            Ok(hash) if hash == record.content_hash => Ok(()),
            _ => Err(stale()),
        }
    }

    fn resolve_concrete(&mut self, name: &str) -> GraphResult<String> {
        let key = NamingConventions::normalize_key(name);

        if let Some(memo) = self
            .state
            .records
            .get(&key)
            .and_then(|record| record.resolved_descendant.clone())
        {
            self.ensure_fresh(&NamingConventions::normalize_key(&memo))?;
            debug!("后代解析命中记忆: {} -> {}", name, memo);
            return Ok(memo);
        }

        self.ensure_known(&key, name)?;
        let leaves = self.leaves_of(&key)?;
        let resolved = match leaves.as_slice() {
            [leaf] => self.display_name(leaf),
            _ => {
                let mut candidates: Vec<Candidate> = leaves
                    .iter()
                    .filter_map(|leaf| self.state.records.get(leaf))
                    .map(|record| Candidate {
                        name: record.qualified_name.clone(),
                        source_path: record.source_path.clone(),
                    })
                    .collect();
                candidates.sort_by(|a, b| a.name.cmp(&b.name));
                return Err(GraphError::AmbiguousResolution {
                    type_name: self.display_name(&key),
                    candidates,
                });
            }
        };
        self.ensure_fresh(&NamingConventions::normalize_key(&resolved))?;

        debug!("后代解析: {} -> {}", name, resolved);
        if let Some(record) = self.state.records.get_mut(&key) {
            record.resolved_descendant = Some(resolved.clone());
            self.persist();
        }
        Ok(resolved)
    }

    fn resolve_all_concrete(&mut self, name: &str) -> GraphResult<Vec<String>> {
        let key = NamingConventions::normalize_key(name);
        if let Some(memo) = self.state.concrete_memo.get(&key) {
            return Ok(memo.clone());
        }

        self.ensure_known(&key, name)?;
        let mut concrete: Vec<String> = self
            .leaves_of(&key)?
            .iter()
            .filter_map(|leaf| self.state.records.get(leaf))
            .filter(|record| record.instantiable)
            .map(|record| record.qualified_name.clone())
            .collect();
        concrete.sort();
        concrete.dedup();

        self.state.concrete_memo.insert(key, concrete.clone());
        self.persist();
        Ok(concrete)
    }

    /// 执行一次操作；遇到未知类型或过期记录时完整重载一次后重试
    fn with_reload_retry<T>(
        &mut self,
        name: &str,
        operation: impl Fn(&mut Self) -> GraphResult<T>,
    ) -> GraphResult<T> {
        match operation(self) {
            Err(err) if err.triggers_reload() => {
                warn!("解析 {} 失败 ({})，重载类型图后重试", name, err);
                match self.reload() {
                    Ok(_) => {}
                    Err(GraphError::ScanFailures { failures, .. }) => {
                        warn!("重载时有 {} 个文件扫描失败", failures.len());
                    }
                    Err(err) => return Err(err),
                }
                operation(self)
            }
            result => result,
        }
    }

    fn walk_ancestors(&self, key: &str) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::from([key.to_string()]);
        let mut queue: VecDeque<String> = VecDeque::from([key.to_string()]);
        let mut ancestors = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(record) = self.state.records.get(&current) else {
                continue;
            };
            for parent in &record.parents {
                let parent_key = NamingConventions::normalize_key(parent);
                if seen.insert(parent_key.clone()) {
                    ancestors.push(parent_key.clone());
                    queue.push_back(parent_key);
                }
            }
        }
        ancestors
    }
}

impl TypeRegistry for TypeGraph {
    fn add_path(&mut self, path: &Path) -> GraphResult<usize> {
        let path = normalize_path(path);
        if !self.file_system.exists(&path) {
            return Err(GraphError::file_system(&path, "路径不存在"));
        }
        if !self.file_system.is_dir(&path) {
            return self.add_file(&path);
        }
        if let Some(unit) = self.covering_unit(&path) {
            debug!("{} 已被 {} 覆盖，跳过", path.display(), unit.path.display());
            return Ok(0);
        }

        if let Some(index) = self.unit_index(&path, ScanUnitKind::Directory) {
            let child_count = self.file_system.child_count(&path)?.to_string();
            if self.state.scan_units[index].signature == child_count {
                debug!("目录 {} 未变化，跳过", path.display());
                return Ok(0);
            }
            info!("目录 {} 的子项数量变化，重载类型图", path.display());
            let before = self.state.records.len();
            let total = self.reload()?;
            return Ok(total.saturating_sub(before));
        }

        let mut batch = ScanBatch::default();
        let unit = self.scan_directory(&path, &mut batch)?;
        // 新目录覆盖的已有单元变得多余
        self.state.scan_units.retain(|existing| !unit.covers(&existing.path));
        self.state.scan_units.push(unit);
        self.clear_memos();
        self.persist();

        info!(
            "已添加目录 {}: 注册 {} 个类型, {} 个文件失败",
            path.display(),
            batch.registered,
            batch.failures.len()
        );
        batch.into_result()
    }

    fn add_file(&mut self, path: &Path) -> GraphResult<usize> {
        let path = normalize_path(path);
        if !self.file_system.exists(&path) {
            return Err(GraphError::file_system(&path, "文件不存在"));
        }
        if let Some(unit) = self.covering_unit(&path) {
            debug!("{} 已被 {} 覆盖，跳过", path.display(), unit.path.display());
            return Ok(0);
        }

        let content_hash = self.file_system.content_hash(&path)?;
        if let Some(index) = self.unit_index(&path, ScanUnitKind::File) {
            if self.state.scan_units[index].signature == content_hash {
                debug!("文件 {} 未变化，跳过", path.display());
                return Ok(0);
            }
            info!("文件 {} 内容变化，重载类型图", path.display());
            let before = self.state.records.len();
            let total = self.reload()?;
            return Ok(total.saturating_sub(before));
        }

        let registered = self.register_file(&path)?;
        self.state.scan_units.push(ScanUnit::file(&path, content_hash));
        self.clear_memos();
        self.persist();
        info!("已添加文件 {}: 注册 {} 个类型", path.display(), registered);
        Ok(registered)
    }

    fn has_type(&self, name: &str) -> bool {
        self.state
            .records
            .contains_key(&NamingConventions::normalize_key(name))
    }

    fn find_concrete_type(&mut self, name: &str) -> GraphResult<String> {
        self.with_reload_retry(name, |graph| graph.resolve_concrete(name))
    }

    fn find_all_concrete_types(&mut self, name: &str, excluding: &[&str]) -> GraphResult<Vec<String>> {
        let all = self.with_reload_retry(name, |graph| graph.resolve_all_concrete(name))?;
        Ok(all
            .into_iter()
            .filter(|candidate| {
                !excluding
                    .iter()
                    .any(|excluded| NamingConventions::same_type(candidate, excluded))
            })
            .collect())
    }

    fn is_descendant_of(&self, child: &str, parent: &str) -> bool {
        let child_key = NamingConventions::normalize_key(child);
        let parent_key = NamingConventions::normalize_key(parent);
        child_key == parent_key || self.walk_ancestors(&child_key).contains(&parent_key)
    }

    fn ancestors(&self, name: &str) -> Vec<String> {
        let key = NamingConventions::normalize_key(name);
        self.walk_ancestors(&key)
            .iter()
            .map(|ancestor| match self.state.records.get(ancestor) {
                Some(record) => record.qualified_name.clone(),
                None => self.declared_parent_name(ancestor),
            })
            .collect()
    }

    fn record(&self, name: &str) -> Option<TypeRecord> {
        self.state
            .records
            .get(&NamingConventions::normalize_key(name))
            .cloned()
    }

    fn annotate(&mut self, name: &str, info: HashMap<String, serde_json::Value>) -> GraphResult<()> {
        let key = NamingConventions::normalize_key(name);
        let record = self
            .state
            .records
            .get_mut(&key)
            .ok_or_else(|| GraphError::unknown(NamingConventions::canonical_name(name)))?;
        record.annotate(info);
        self.persist();
        Ok(())
    }

    fn reload(&mut self) -> GraphResult<usize> {
        let previous = std::mem::replace(
            &mut self.state,
            GraphState {
                version: STATE_VERSION,
                ..GraphState::default()
            },
        );

        let mut batch = ScanBatch::default();
        if let Err(err) = self.rescan_units(&previous.scan_units, &mut batch) {
            warn!("类型图 {} 重载失败，保留原状态: {}", self.options.name, err);
            self.state = previous;
            return Err(err);
        }
        self.persist();

        let total = self.state.records.len();
        info!(
            "类型图 {} 已重载: {} 条记录, {} 个文件失败",
            self.options.name,
            total,
            batch.failures.len()
        );
        ScanBatch {
            registered: total,
            failures: batch.failures,
        }
        .into_result()
    }

    fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .records
            .values()
            .map(|record| record.qualified_name.clone())
            .collect();
        names.sort();
        names
    }

    fn len(&self) -> usize {
        self.state.records.len()
    }
}

impl TypeGraph {
    /// 没有记录的父类型按其首次被声明时的写法返回
    fn declared_parent_name(&self, key: &str) -> String {
        self.state
            .records
            .values()
            .flat_map(|record| record.parents.iter())
            .find(|parent| NamingConventions::normalize_key(parent) == key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

impl fmt::Debug for TypeGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeGraph")
            .field("name", &self.options.name)
            .field("file_system", &self.file_system.name())
            .field("cache", &self.cache.name())
            .field("scanner", &self.scanner.name())
            .field("records", &self.state.records.len())
            .field("scan_units", &self.state.scan_units.len())
            .finish()
    }
}
