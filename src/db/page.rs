use serde::Serialize;
use thiserror::Error;

/// Sortable columns of the `messages` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    MessageId,
    ChannelId,
    ChannelName,
    GuildId,
    AuthorId,
    AuthorName,
    Content,
    Timestamp,
    EditedTimestamp,
}

impl SortField {
    /// Accepts the JSON (camelCase) property names as well as the column names.
    pub fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "id" => Self::Id,
            "messageId" | "message_id" => Self::MessageId,
            "channelId" | "channel_id" => Self::ChannelId,
            "channelName" | "channel_name" => Self::ChannelName,
            "guildId" | "guild_id" => Self::GuildId,
            "authorId" | "author_id" => Self::AuthorId,
            "authorName" | "author_name" => Self::AuthorName,
            "content" => Self::Content,
            "timestamp" => Self::Timestamp,
            "editedTimestamp" | "edited_timestamp" => Self::EditedTimestamp,
            _ => return None,
        };
        Some(field)
    }

    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::MessageId => "message_id",
            Self::ChannelId => "channel_id",
            Self::ChannelName => "channel_name",
            Self::GuildId => "guild_id",
            Self::AuthorId => "author_id",
            Self::AuthorName => "author_name",
            Self::Content => "content",
            Self::Timestamp => "timestamp",
            Self::EditedTimestamp => "edited_timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SortError {
    #[error("sort field is empty")]
    EmptyField,
    #[error("unknown sort field '{0}'")]
    UnknownField(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: Direction,
}

impl Sort {
    pub fn new(field: SortField, direction: Direction) -> Self {
        Self { field, direction }
    }

    /// Storage (insertion) order.
    pub fn unsorted() -> Self {
        Self::new(SortField::Id, Direction::Asc)
    }

    /// Parses `field,direction`. Only a case-insensitive `desc` selects
    /// descending order; a missing or unrecognized direction is ascending.
    pub fn parse(input: &str) -> Result<Self, SortError> {
        let mut parts = input.split(',');
        let field = parts.next().unwrap_or_default().trim();
        if field.is_empty() {
            return Err(SortError::EmptyField);
        }
        let field =
            SortField::from_name(field).ok_or_else(|| SortError::UnknownField(field.to_string()))?;

        let direction = match parts.next() {
            Some(d) if d.trim().eq_ignore_ascii_case("desc") => Direction::Desc,
            _ => Direction::Asc,
        };
        Ok(Self::new(field, direction))
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::unsorted()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
    pub sort: Sort,
}

impl PageRequest {
    /// A zero `size` is raised to 1.
    pub fn of(page: u32, size: u32, sort: Sort) -> Self {
        Self {
            page,
            size: size.max(1),
            sort,
        }
    }

    pub fn first(size: u32) -> Self {
        Self::of(0, size, Sort::unsorted())
    }

    /// Saturates; a page past the end of any table is simply empty.
    pub(crate) fn offset(&self) -> i64 {
        i64::from(self.page).saturating_mul(i64::from(self.size))
    }
}

/// One slice of a paginated query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        let size = u64::from(request.size.max(1));
        Self {
            content,
            page: request.page,
            size: request.size,
            total_elements,
            total_pages: total_elements.div_ceil(size),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_directions() {
        assert_eq!(
            Sort::parse("content,asc").unwrap(),
            Sort::new(SortField::Content, Direction::Asc)
        );
        assert_eq!(
            Sort::parse("timestamp,desc").unwrap(),
            Sort::new(SortField::Timestamp, Direction::Desc)
        );
        assert_eq!(
            Sort::parse("timestamp,DESC").unwrap().direction,
            Direction::Desc
        );
        // Unrecognized or missing direction falls back to ascending
        assert_eq!(Sort::parse("content,foo").unwrap().direction, Direction::Asc);
        assert_eq!(Sort::parse("authorName").unwrap().direction, Direction::Asc);
    }

    #[test]
    fn test_parse_sort_rejects_unknown_field() {
        assert_eq!(Sort::parse(""), Err(SortError::EmptyField));
        assert_eq!(
            Sort::parse("password,desc"),
            Err(SortError::UnknownField("password".to_string()))
        );
    }

    #[test]
    fn test_page_totals() {
        let request = PageRequest::of(1, 20, Sort::unsorted());
        let page: Page<u8> = Page::new(Vec::new(), &request, 41);
        assert_eq!(page.total_pages, 3);
        assert_eq!(request.offset(), 20);

        let empty: Page<u8> = Page::new(Vec::new(), &request, 0);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn test_offset_saturates() {
        let request = PageRequest::of(u32::MAX, u32::MAX, Sort::unsorted());
        assert_eq!(request.offset(), i64::MAX);
        let page: Page<u8> = Page::new(Vec::new(), &request, 3);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn test_zero_size_is_raised() {
        assert_eq!(PageRequest::of(0, 0, Sort::unsorted()).size, 1);
    }
}
