//! Category command handlers.

use crate::args::{IdArgs, InsertCategoryArgs, UpdateCategoryArgs};
use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::model::{Category, CategoryUpdate};
use crate::{Config, Result};
use anyhow::anyhow;

/// Creates a new category.
///
/// # Errors
///
/// - Returns a request error if the name is blank or a category with the same name exists.
/// - Returns a database error if a database operation fails.
pub async fn insert_category(config: Config, args: InsertCategoryArgs) -> Result<Out<Category>> {
    let name = args.name.trim();
    if name.is_empty() {
        return Err(anyhow!("Category name cannot be empty")).pub_result(ErrorType::Request);
    }
    let description = args.description.as_deref().map(str::trim);

    let category = config
        .db()
        .insert_category(name, description)
        .await
        .map_err(|e| {
            if format!("{e:#}").contains("UNIQUE constraint failed") {
                anyhow!("Cannot insert category: '{name}' already exists.")
            } else {
                e
            }
        })
        .pub_result(ErrorType::Database)?;

    let message = format!("Inserted category {} ({})", category.name, category.id);
    Ok(Out::new(message, category))
}

/// Lists every category, ordered by name, with the number of expenses in each.
pub async fn list_categories(config: Config) -> Result<Out<Vec<Category>>> {
    let categories = config
        .db()
        .list_categories()
        .await
        .pub_result(ErrorType::Database)?;
    let message = format!("Found {} categories", categories.len());
    Ok(Out::new(message, categories))
}

pub async fn get_category(config: Config, args: IdArgs) -> Result<Out<Category>> {
    let category = config
        .db()
        .get_category(&args.id)
        .await
        .pub_result(ErrorType::Database)?
        .ok_or_else(|| anyhow!("Category '{}' not found", args.id))
        .pub_result(ErrorType::Request)?;
    Ok(Out::new(format!("Category {}", category.name), category))
}

/// Changes the name and/or description of a category.
///
/// # Errors
///
/// - Returns a request error if nothing would change, the category does not exist, or the new
///   name is taken.
pub async fn update_category(config: Config, args: UpdateCategoryArgs) -> Result<Out<Category>> {
    let update = CategoryUpdate {
        name: args.name.map(|n| n.trim().to_string()),
        description: args.description,
    };
    if update.is_empty() {
        return Err(anyhow!("Nothing to update, pass --name and/or --description"))
            .pub_result(ErrorType::Request);
    }
    if update.name.as_deref() == Some("") {
        return Err(anyhow!("Category name cannot be empty")).pub_result(ErrorType::Request);
    }

    let category = config
        .db()
        .update_category(&args.id, &update)
        .await
        .pub_result(ErrorType::Request)?;
    Ok(Out::new(format!("Updated category {}", category.name), category))
}

/// Deletes a category.
///
/// # Errors
///
/// - Returns a request error if the category does not exist or still has expenses.
pub async fn delete_category(config: Config, args: IdArgs) -> Result<Out<Category>> {
    let category = config
        .db()
        .delete_category(&args.id)
        .await
        .pub_result(ErrorType::Request)?;
    Ok(Out::new(format!("Deleted category {}", category.name), category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    fn insert_args(name: &str) -> InsertCategoryArgs {
        InsertCategoryArgs {
            name: name.to_string(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_insert_category_success() {
        let env = TestEnv::new().await;
        let args = InsertCategoryArgs {
            name: "  Equipment ".to_string(),
            description: Some("Weights and mats".to_string()),
        };
        let out = insert_category(env.config(), args).await.unwrap();
        assert!(out.message().contains("Inserted category Equipment"));
        let category = out.structure().unwrap();
        assert_eq!(category.name, "Equipment");
        assert_eq!(category.description.as_deref(), Some("Weights and mats"));

        let found = get_category(env.config(), IdArgs { id: category.id.clone() })
            .await
            .unwrap();
        assert_eq!(found.structure().unwrap().name, "Equipment");
    }

    #[tokio::test]
    async fn test_insert_category_duplicate() {
        let env = TestEnv::new().await;
        insert_category(env.config(), insert_args("Rent")).await.unwrap();
        let e = insert_category(env.config(), insert_args("Rent"))
            .await
            .unwrap_err();
        assert!(format!("{e:#}").contains("'Rent' already exists"));
    }

    #[tokio::test]
    async fn test_insert_category_blank_name() {
        let env = TestEnv::new().await;
        let e = insert_category(env.config(), insert_args("   "))
            .await
            .unwrap_err();
        assert!(format!("{e:#}").starts_with("request error"));
    }

    #[tokio::test]
    async fn test_update_and_list_categories() {
        let env = TestEnv::new().await;
        let rent = env.insert_category("Rent").await;
        env.insert_category("Cleaning").await;

        let args = UpdateCategoryArgs {
            id: rent.id.clone(),
            name: Some("Lease".to_string()),
            description: None,
        };
        let out = update_category(env.config(), args).await.unwrap();
        assert_eq!(out.structure().unwrap().name, "Lease");

        let empty = UpdateCategoryArgs {
            id: rent.id.clone(),
            name: None,
            description: None,
        };
        assert!(update_category(env.config(), empty).await.is_err());

        let list = list_categories(env.config()).await.unwrap();
        let names: Vec<&str> = list
            .structure()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["Cleaning", "Lease"]);
    }

    #[tokio::test]
    async fn test_get_category_not_found() {
        let env = TestEnv::new().await;
        let e = get_category(env.config(), IdArgs { id: "nope".into() })
            .await
            .unwrap_err();
        assert_eq!(format!("{e:#}"), "request error: Category 'nope' not found");
    }

    #[tokio::test]
    async fn test_delete_category() {
        let env = TestEnv::new().await;
        let rent = env.insert_category("Rent").await;
        env.insert_expense("100", "UYU", &rent.id, "2025-01-01").await;

        let e = delete_category(env.config(), IdArgs { id: rent.id.clone() })
            .await
            .unwrap_err();
        assert!(format!("{e:#}").contains("still has 1 expense(s)"));

        let empty = env.insert_category("Empty").await;
        let out = delete_category(env.config(), IdArgs { id: empty.id.clone() })
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap().id, empty.id);
        assert!(get_category(env.config(), IdArgs { id: empty.id }).await.is_err());
    }
}
