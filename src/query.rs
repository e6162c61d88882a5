use rust_decimal::Decimal;
use serde::Deserialize;

use crate::db::BOX_COLUMNS;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: u32 = 100;

/// A value bound to a positional placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SearchParam {
    Text(String),
    Amount(Decimal),
}

/// Escape LIKE wildcards so user input only matches literally
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// SQL query builder for catalog search
/// Builds one parameterized query with filters, sorting, and pagination
pub struct SQLQueryBuilder {
    base_query: String,
    where_clauses: Vec<String>,
    params: Vec<SearchParam>,
    order_clause: Option<String>,
    limit: u32,
    offset: u32,
}

impl Default for SQLQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SQLQueryBuilder {
    /// Creates a builder that only sees active boxes
    pub fn new() -> Self {
        Self {
            base_query: format!("SELECT {} FROM boxes", BOX_COLUMNS),
            where_clauses: vec!["is_active = TRUE".to_string()],
            params: Vec::new(),
            order_clause: None,
            limit: 10,
            offset: 0,
        }
    }

    fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }

    /// Partial, case-insensitive match on name or description
    pub fn add_search_filter(&mut self, search: &str) {
        let index = self.next_placeholder();
        self.where_clauses.push(format!(
            "(name ILIKE ${0} ESCAPE '\\' OR description ILIKE ${0} ESCAPE '\\')",
            index
        ));
        self.params.push(SearchParam::Text(format!("%{}%", escape_like(search))));
    }

    /// Case-insensitive exact category match
    pub fn add_category_filter(&mut self, category: &str) {
        let index = self.next_placeholder();
        self.where_clauses.push(format!("category ILIKE ${} ESCAPE '\\'", index));
        self.params.push(SearchParam::Text(escape_like(category)));
    }

    /// Inclusive price bounds
    pub fn add_price_range(&mut self, min: Option<Decimal>, max: Option<Decimal>) {
        if let Some(min_price) = min {
            let index = self.next_placeholder();
            self.where_clauses.push(format!("price >= ${}", index));
            self.params.push(SearchParam::Amount(min_price));
        }

        if let Some(max_price) = max {
            let index = self.next_placeholder();
            self.where_clauses.push(format!("price <= ${}", index));
            self.params.push(SearchParam::Amount(max_price));
        }
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        let field_name = match field {
            SortField::Price => "price",
            SortField::Rating => "rating",
            SortField::Newest => "created_at",
        };

        let order_str = match order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };

        // id as tie breaker keeps pages stable
        self.order_clause = Some(format!("{} {}, id ASC", field_name, order_str));
    }

    pub fn set_pagination(&mut self, page: u32, limit: u32) {
        self.limit = limit;
        self.offset = (page - 1) * limit;
    }

    /// Returns the SQL text and the values to bind, in placeholder order
    pub fn build(&self) -> (String, Vec<SearchParam>) {
        let mut query = self.base_query.clone();

        if !self.where_clauses.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&self.where_clauses.join(" AND "));
        }

        query.push_str(" ORDER BY ");
        query.push_str(self.order_clause.as_deref().unwrap_or("id ASC"));

        // LIMIT/OFFSET are validated integers, inlined rather than bound
        query.push_str(&format!(" LIMIT {}", self.limit));
        query.push_str(&format!(" OFFSET {}", self.offset));

        (query, self.params.clone())
    }
}

/// Query parameters for GET /api/search and GET /api/boxes
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    /// Free-text search over name and description
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    /// "price", "rating" or "newest"
    pub sort: Option<String>,
    /// "asc" or "desc"
    pub order: Option<String>,
    /// 1-indexed page number
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Price,
    Rating,
    Newest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Search parameters after validation and defaulting
#[derive(Debug)]
pub struct ValidatedQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort_field: Option<SortField>,
    pub sort_order: SortOrder,
    pub page: u32,
    pub limit: u32,
}

impl ValidatedQuery {
    /// Turn the validated parameters into a ready-to-run builder
    pub fn into_builder(self) -> SQLQueryBuilder {
        let mut builder = SQLQueryBuilder::new();
        if let Some(search) = &self.search {
            builder.add_search_filter(search);
        }
        if let Some(category) = &self.category {
            builder.add_category_filter(category);
        }
        builder.add_price_range(self.min_price, self.max_price);
        if let Some(field) = self.sort_field {
            builder.set_sort(field, self.sort_order);
        }
        builder.set_pagination(self.page, self.limit);
        builder
    }
}

#[derive(Debug)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

pub struct QueryValidator;

impl QueryValidator {
    pub fn validate(params: SearchParams) -> Result<ValidatedQuery, ValidationError> {
        let search = Self::normalize_string(params.q);
        let category = Self::normalize_string(params.category);

        let min_price = params
            .min_price
            .map(|price| Self::validate_price(price, "min_price").map(|_| price))
            .transpose()?;
        let max_price = params
            .max_price
            .map(|price| Self::validate_price(price, "max_price").map(|_| price))
            .transpose()?;

        if let (Some(min), Some(max)) = (min_price, max_price) {
            if min > max {
                return Err(ValidationError {
                    message: "min_price cannot be greater than max_price".to_string(),
                });
            }
        }

        let sort_field = params
            .sort
            .as_deref()
            .map(Self::parse_sort_field)
            .transpose()?;

        let sort_order = match params.order.as_deref() {
            Some(order) => Self::parse_sort_order(order)?,
            None => match sort_field {
                Some(SortField::Price) | None => SortOrder::Asc,
                Some(SortField::Rating) | Some(SortField::Newest) => SortOrder::Desc,
            },
        };

        let page = params.page.unwrap_or(1);
        Self::validate_pagination_param(page, "page")?;

        let limit = params.limit.unwrap_or(10);
        Self::validate_pagination_param(limit, "limit")?;
        if limit > MAX_PAGE_SIZE {
            return Err(ValidationError {
                message: format!("limit must not exceed {}", MAX_PAGE_SIZE),
            });
        }

        Ok(ValidatedQuery {
            search,
            category,
            min_price,
            max_price,
            sort_field,
            sort_order,
            page,
            limit,
        })
    }

    /// Trims whitespace; empty strings become None
    fn normalize_string(s: Option<String>) -> Option<String> {
        s.and_then(|s| {
            let trimmed = s.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
    }

    fn validate_price(price: Decimal, param_name: &str) -> Result<(), ValidationError> {
        if price < Decimal::ZERO {
            return Err(ValidationError {
                message: format!("{} must not be negative", param_name),
            });
        }
        Ok(())
    }

    fn parse_sort_field(s: &str) -> Result<SortField, ValidationError> {
        match s.to_lowercase().as_str() {
            "price" => Ok(SortField::Price),
            "rating" => Ok(SortField::Rating),
            "newest" => Ok(SortField::Newest),
            _ => Err(ValidationError {
                message: format!("Invalid sort field '{}'. Must be 'price', 'rating' or 'newest'", s),
            }),
        }
    }

    fn parse_sort_order(s: &str) -> Result<SortOrder, ValidationError> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ValidationError {
                message: format!("Invalid sort order '{}'. Must be 'asc' or 'desc'", s),
            }),
        }
    }

    fn validate_pagination_param(value: u32, param_name: &str) -> Result<(), ValidationError> {
        if value == 0 {
            return Err(ValidationError {
                message: format!("{} must be a positive number (greater than 0)", param_name),
            });
        }
        Ok(())
    }
}
