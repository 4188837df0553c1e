#![allow(dead_code)]

pub mod temp_files {
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write `content` to a temp file with the given extension. The file is removed when the
    /// returned handle drops.
    pub fn create_temp_spec(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("specmock_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    pub fn create_temp_yaml(content: &str) -> NamedTempFile {
        create_temp_spec(content, "yaml")
    }

    pub fn create_temp_json(content: &str) -> NamedTempFile {
        create_temp_spec(content, "json")
    }
}

pub mod fixtures {
    use specmock::spec::Document;

    /// A small bookstore API touching every schema kind and format.
    pub const BOOKS_YAML: &str = r##"
openapi: 3.1.0
info:
  title: Books
  version: "1.0"
paths:
  /books:
    get:
      operationId: listBooks
      responses:
        "200":
          description: all books
          content:
            application/json:
              schema:
                type: array
                items: { $ref: "#/components/schemas/Book" }
    post:
      operationId: createBook
      requestBody:
        required: true
        content:
          application/json:
            schema: { $ref: "#/components/schemas/NewBook" }
      responses:
        "201":
          description: created
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Book" }
        "400":
          description: invalid
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Error" }
  /books/featured:
    get:
      operationId: featuredBook
      responses:
        "200":
          description: the featured book
          content:
            application/json:
              example: { id: 1, title: "Dune" }
  /books/{bookId}:
    get:
      operationId: getBook
      responses:
        "200":
          description: one book
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Book" }
        "404":
          description: missing
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Error" }
    delete:
      operationId: deleteBook
      responses:
        "204": { description: deleted }
        "404": { description: missing }
  /broken:
    get:
      operationId: broken
      responses:
        "500": { description: only failures here }
components:
  schemas:
    Book:
      type: object
      required: [id, title, isbn]
      properties:
        id: { type: integer, minimum: 1, maximum: 100000 }
        title: { type: string, minLength: 1, maxLength: 40 }
        isbn: { type: string, format: uuid }
        contact: { type: string, format: email }
        published: { type: string, format: date }
        updatedAt: { type: string, format: date-time }
        price: { type: number, minimum: 1, maximum: 500 }
        inStock: { type: boolean }
        genre: { type: string, enum: [fiction, history, science] }
        tags:
          type: array
          minItems: 1
          maxItems: 3
          items: { type: string, maxLength: 12 }
    NewBook:
      type: object
      required: [title]
      properties:
        title: { type: string, minLength: 1 }
        author: { type: string }
        pages: { type: integer, minimum: 1 }
    Error:
      type: object
      required: [code, message]
      properties:
        code: { type: integer }
        message: { type: string }
"##;

    pub fn books() -> Document {
        Document::from_yaml_str(BOOKS_YAML).unwrap()
    }
}

pub mod test_server {
    use std::sync::Once;

    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}
